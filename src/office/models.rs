use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployeeAccount {
    pub id: String,
    pub username: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankAccount {
    pub username: String,
    pub bank_name: String,
    pub is_active: bool,
}

/// Fields of the public contact form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A file attached to a form post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactSubmission {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub message: Option<String>,
    pub document_url: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GalleryImage {
    pub id: String,
    pub title: String,
    pub storage_path: String,
    pub image_url: String,
    pub display_order: i64,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LitigationCase {
    pub id: String,
    #[serde(default)]
    pub case_no: Option<String>,
    #[serde(default)]
    pub borrower_name: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLitigationCase {
    #[serde(default)]
    pub case_no: Option<String>,
    #[serde(default)]
    pub borrower_name: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// The two admin-managed name lists offered when creating an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    LoanType,
    ApplicationType,
}

impl CatalogKind {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::LoanType => "loan_types",
            CatalogKind::ApplicationType => "application_types",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::LoanType => "loan type",
            CatalogKind::ApplicationType => "application type",
        }
    }
}

/// A row of `loan_types` or `application_types`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<FixedOffset>,
}

/// Last issued document sequence number for one bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankCounter {
    pub bank_name: String,
    pub last_sequence: i64,
}
