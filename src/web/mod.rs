//! HTTP surface: REST endpoints, object serving and the live case list
//! socket.
//!
//! ```text
//!   client ── GET /api/cases ──────► fetch ─► project ─► filter ─► JSON
//!   client ══ /ws/cases ═══════════► LiveCaseList (one per socket)
//!                                     ├─ Snapshot
//!                                     ├─ CaseUpdated  ◄── ChangeFeed
//!                                     └─ Notification
//! ```

pub mod api;
pub mod server;
pub mod ws;

pub use server::{ServerConfig, build_router, start_server};
