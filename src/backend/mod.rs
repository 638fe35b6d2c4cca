//! Storage collaborator for the case list and office services.
//!
//! ```text
//!   ListSynchronizer / web handlers
//!              │
//!              ▼
//!      dyn CaseBackend ──────────────┐
//!              │                     │
//!        LocalBackend          (test doubles)
//!     ┌────────┼─────────┐
//!     ▼        ▼         ▼
//!   CaseDb  ObjectStore  ChangeFeed
//!  (SQLite)  (buckets)   (broadcast)
//! ```
//!
//! | Module    | Purpose                                              |
//! |-----------|------------------------------------------------------|
//! | `db`      | SQLite schema, row mapping, async `DbHandle`         |
//! | `feed`    | Broadcast change feed and drop-to-unsubscribe handle |
//! | `storage` | Filesystem buckets with public URLs                  |
//! | `local`   | `LocalBackend`, the production `CaseBackend`         |

pub mod db;
pub mod feed;
pub mod local;
pub mod storage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cases::models::{CaseRecord, CaseStatus, Session};
use crate::errors::BackendError;

pub use feed::{ChangeFeed, Subscription};
pub use local::LocalBackend;
pub use storage::ObjectStore;

/// Filterable and sortable columns of the `applications` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseColumn {
    Id,
    ApplicationId,
    BankName,
    Status,
    ApplicationType,
    AssignedToUsername,
    OriginalAssignedToUsername,
    OfficeBranch,
    CreatedAt,
    SubmissionDate,
}

impl CaseColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseColumn::Id => "id",
            CaseColumn::ApplicationId => "application_id",
            CaseColumn::BankName => "bank_name",
            CaseColumn::Status => "status",
            CaseColumn::ApplicationType => "application_type",
            CaseColumn::AssignedToUsername => "assigned_to_username",
            CaseColumn::OriginalAssignedToUsername => "original_assigned_to_username",
            CaseColumn::OfficeBranch => "office_branch",
            CaseColumn::CreatedAt => "created_at",
            CaseColumn::SubmissionDate => "submission_date",
        }
    }
}

/// A row predicate for bulk reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(CaseColumn, String),
    In(CaseColumn, Vec<String>),
    /// Any of the nested predicates holds.
    Or(Vec<Predicate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: CaseColumn,
    pub descending: bool,
}

/// A bulk read of case rows: all predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseQuery {
    pub predicates: Vec<Predicate>,
    pub order: Option<OrderBy>,
}

impl CaseQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, column: CaseColumn, descending: bool) -> Self {
        self.order = Some(OrderBy { column, descending });
        self
    }

    /// The working list for a session, newest first.
    ///
    /// An employee view sees cases assigned to them now or originally; any
    /// other view sees cases in an active status.
    pub fn for_session(session: &Session) -> Self {
        let query = match session.scoped_employee() {
            Some(username) => Self::all().filter(Predicate::Or(vec![
                Predicate::Eq(CaseColumn::AssignedToUsername, username.to_string()),
                Predicate::Eq(CaseColumn::OriginalAssignedToUsername, username.to_string()),
            ])),
            None => Self::all().filter(Predicate::In(
                CaseColumn::Status,
                CaseStatus::ACTIVE.iter().map(|s| s.as_str().to_string()).collect(),
            )),
        };
        query.order_by(CaseColumn::CreatedAt, true)
    }
}

/// Table reads, point updates and change subscription for case rows.
#[async_trait]
pub trait CaseBackend: Send + Sync {
    async fn fetch_cases(&self, query: CaseQuery) -> Result<Vec<CaseRecord>, BackendError>;

    /// Set the status of one case and return the updated row. Publishes the
    /// change to subscribers.
    async fn update_case_status(&self, id: &str, status: &str) -> Result<CaseRecord, BackendError>;

    fn subscribe(&self) -> Subscription;
}
