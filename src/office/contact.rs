//! Public contact form and the admin view of its submissions.

use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::models::{Attachment, ContactForm, ContactSubmission};
use crate::backend::LocalBackend;
use crate::backend::storage::extension_of;
use crate::cases::filter::DateBounds;
use crate::errors::{BackendError, OfficeError};

pub const CONTACT_BUCKET: &str = "query-attachments";
pub const CONTACT_DOCUMENT_PREFIX: &str = "contact-documents";
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Validate and store a contact form post.
///
/// Name and email are required. An attachment is uploaded to
/// `query-attachments/contact-documents/<uuid>.<ext>` before the row is
/// written; if the row insert fails the upload is removed again.
pub async fn submit_contact(
    backend: &LocalBackend,
    form: ContactForm,
    attachment: Option<Attachment>,
) -> Result<ContactSubmission, OfficeError> {
    let form = ContactForm {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone_number: non_empty(form.phone_number),
        message: non_empty(form.message),
    };
    if form.name.is_empty() {
        return Err(OfficeError::MissingField("name"));
    }
    if form.email.is_empty() {
        return Err(OfficeError::MissingField("email"));
    }
    if let Some(att) = &attachment
        && att.bytes.len() > MAX_ATTACHMENT_BYTES
    {
        return Err(OfficeError::AttachmentTooLarge {
            size: att.bytes.len(),
            limit: MAX_ATTACHMENT_BYTES,
        });
    }

    let storage = backend.storage();
    let uploaded = match attachment {
        Some(att) => {
            let path = format!(
                "{}/{}.{}",
                CONTACT_DOCUMENT_PREFIX,
                uuid::Uuid::new_v4(),
                extension_of(&att.file_name)
            );
            storage.upload(CONTACT_BUCKET, &path, &att.bytes).await?;
            Some(path)
        }
        None => None,
    };
    let document_url = uploaded
        .as_deref()
        .map(|path| storage.public_url(CONTACT_BUCKET, path));

    let insert_form = form.clone();
    let result = backend
        .db()
        .call(move |db| db.insert_contact_submission(&insert_form, document_url.as_deref()))
        .await;

    match result {
        Ok(submission) => {
            info!(
                id = %submission.id,
                has_document = submission.document_url.is_some(),
                "Contact submission received"
            );
            Ok(submission)
        }
        Err(e) => {
            if let Some(path) = uploaded
                && let Err(cleanup) = storage.delete(CONTACT_BUCKET, &path).await
            {
                warn!(path = %path, error = %cleanup, "Failed to remove orphaned attachment");
            }
            Err(BackendError::Database(e).into())
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Search and date criteria for the submissions table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionFilter {
    /// Case-insensitive match on the name, or a substring of the phone number.
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Submissions matching `filter`, order preserved. Day bounds are resolved
/// in `tz` the same way as the case list's date range.
pub fn filter_submissions<Tz: TimeZone>(
    submissions: &[ContactSubmission],
    filter: &SubmissionFilter,
    tz: &Tz,
) -> Vec<ContactSubmission> {
    let search = filter.search.to_lowercase();
    let bounds = DateBounds::for_days(filter.start_date, filter.end_date, tz);

    submissions
        .iter()
        .filter(|s| {
            let matches_search = search.is_empty()
                || s.name.to_lowercase().contains(&search)
                || s
                    .phone_number
                    .as_deref()
                    .is_some_and(|p| p.contains(filter.search.as_str()));
            matches_search && bounds.contains(&s.created_at)
        })
        .cloned()
        .collect()
}
