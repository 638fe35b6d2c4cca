//! # Case list view-model
//!
//! Everything between the stored `applications` rows and a rendered list:
//!
//! ```text
//!   CaseBackend::fetch_cases ──► projector::project ──► filter::filter ──► client
//!            ▲                          ▲
//!            │                          │
//!   Subscription::next ──► ListSynchronizer::on_remote_update
//!                                       │
//!                                       └──► Notification (status changed)
//! ```
//!
//! | Module      | Purpose                                                   |
//! |-------------|-----------------------------------------------------------|
//! | `models`    | `CaseRecord`, `DisplayRecord`, `Session`, `CaseStatus`    |
//! | `status`    | Status badge colors and human labels                      |
//! | `projector` | Rupee formatting, date normalization, redirect rewrite    |
//! | `filter`    | Search, select and date-range filtering                   |
//! | `sync`      | Initial fetch, in-place update merge, notifications       |
//! | `analytics` | Legal-opinion, litigation and per-bank aggregates         |

pub mod analytics;
pub mod filter;
pub mod models;
pub mod projector;
pub mod status;
pub mod sync;
