use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::status::StatusColor;

// ── Enums ─────────────────────────────────────────────────────────────

/// Case statuses the back office knows how to transition to.
///
/// Stored records keep their status as a free string so that unknown values
/// and the parameterized `redirected to <user>` form still round-trip; this
/// enum only validates requested transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Draft,
    Submitted,
    ToBeAssigned,
    InReview,
    UnderReview,
    Redirected,
    WaitingForApproval,
    Completed,
    Rejected,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "draft",
            CaseStatus::Submitted => "submitted",
            CaseStatus::ToBeAssigned => "to_be_assigned",
            CaseStatus::InReview => "in_review",
            CaseStatus::UnderReview => "under_review",
            CaseStatus::Redirected => "redirected",
            CaseStatus::WaitingForApproval => "waiting_for_approval",
            CaseStatus::Completed => "completed",
            CaseStatus::Rejected => "rejected",
            CaseStatus::Closed => "closed",
        }
    }

    /// Statuses shown in the unscoped (administrative) working list.
    pub const ACTIVE: [CaseStatus; 5] = [
        CaseStatus::ToBeAssigned,
        CaseStatus::InReview,
        CaseStatus::UnderReview,
        CaseStatus::Redirected,
        CaseStatus::WaitingForApproval,
    ];
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CaseStatus::Draft),
            "submitted" => Ok(CaseStatus::Submitted),
            "to_be_assigned" => Ok(CaseStatus::ToBeAssigned),
            "in_review" => Ok(CaseStatus::InReview),
            "under_review" => Ok(CaseStatus::UnderReview),
            "redirected" => Ok(CaseStatus::Redirected),
            "waiting_for_approval" => Ok(CaseStatus::WaitingForApproval),
            "completed" => Ok(CaseStatus::Completed),
            "rejected" => Ok(CaseStatus::Rejected),
            "closed" => Ok(CaseStatus::Closed),
            _ => Err(format!("Invalid case status: {}", s)),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────

/// Who is looking at a case list, passed explicitly to every component
/// that scopes or rewrites records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Username of the logged-in employee, if any.
    #[serde(default)]
    pub employee: Option<String>,
    /// Whether the list is the administrative view across all records.
    #[serde(default)]
    pub admin_scope: bool,
}

impl Session {
    pub fn admin() -> Self {
        Self {
            employee: None,
            admin_scope: true,
        }
    }

    pub fn employee(username: impl Into<String>) -> Self {
        Self {
            employee: Some(username.into()),
            admin_scope: false,
        }
    }

    /// The employee whose assignments bound the fetch. `None` when the view
    /// is administrative or nobody is logged in.
    pub fn scoped_employee(&self) -> Option<&str> {
        if self.admin_scope {
            None
        } else {
            self.employee.as_deref()
        }
    }
}

// ── Records ───────────────────────────────────────────────────────────

/// A case application row as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseRecord {
    pub id: String,
    pub application_id: String,
    pub borrower_name: String,
    pub bank_name: String,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub loan_amount: f64,
    pub loan_type: String,
    pub application_type: String,
    pub status: String,
    #[serde(default)]
    pub submission_date: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub assigned_to_username: Option<String>,
    #[serde(default)]
    pub original_assigned_to_username: Option<String>,
    #[serde(default)]
    pub office_branch: Option<String>,
    #[serde(default)]
    pub digital_signature_applied: bool,
}

impl CaseRecord {
    /// Submission timestamp, or creation time for rows that never went
    /// through submission.
    pub fn effective_date(&self) -> DateTime<FixedOffset> {
        self.submission_date.unwrap_or(self.created_at)
    }
}

/// Fields accepted when a case is created outside the list view (imports,
/// the submission workflow). Identifier and creation time are assigned by
/// the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCase {
    pub application_id: String,
    pub borrower_name: String,
    pub bank_name: String,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub loan_amount: f64,
    pub loan_type: String,
    pub application_type: String,
    pub status: String,
    #[serde(default)]
    pub submission_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub assigned_to_username: Option<String>,
    #[serde(default)]
    pub original_assigned_to_username: Option<String>,
    #[serde(default)]
    pub office_branch: Option<String>,
    #[serde(default)]
    pub digital_signature_applied: bool,
}

/// A case row ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayRecord {
    #[serde(flatten)]
    pub case: CaseRecord,
    /// Loan amount with a rupee sign and Indian digit grouping.
    pub amount: String,
    /// Calendar day of the effective date.
    pub date: NaiveDate,
    /// Status after the viewer-specific redirect rewrite.
    pub display_status: String,
    pub status_label: String,
    pub status_color: StatusColor,
}

impl DisplayRecord {
    pub fn id(&self) -> &str {
        &self.case.id
    }
}

/// Old and new snapshots of a case row, as delivered by the change feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseChange {
    #[serde(default)]
    pub old: Option<CaseRecord>,
    pub new: CaseRecord,
}

// ── Notifications ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Destructive,
}

/// A user-facing message raised by list synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn status_changed(application_id: &str, status: &str) -> Self {
        Self {
            kind: NotificationKind::Info,
            title: "Status updated".to_string(),
            description: format!("Application {} is now {}.", application_id, status),
        }
    }

    pub fn fetch_failed() -> Self {
        Self {
            kind: NotificationKind::Destructive,
            title: "Error".to_string(),
            description: "Failed to fetch applications".to_string(),
        }
    }
}
