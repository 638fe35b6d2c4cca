//! Admin litigation case list: search, status and bank filters plus the
//! headline counts shown above the list.

use serde::{Deserialize, Serialize};

use super::models::{BankAccount, LitigationCase};
use crate::backend::LocalBackend;
use crate::cases::filter::selected;
use crate::errors::{BackendError, OfficeError};

/// Filter for the litigation list. `bank` names a bank account by
/// username; select values of `"all"` or `""` place no restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LitigationFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LitigationSummary {
    pub total: usize,
    pub pending: usize,
    pub decreed: usize,
    pub dismissed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LitigationListing {
    pub summary: LitigationSummary,
    pub cases: Vec<LitigationCase>,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

/// Apply `filter` to `cases`, keeping input order. A bank username that
/// matches no account in `banks` matches no case.
pub fn filter_cases(
    cases: &[LitigationCase],
    filter: &LitigationFilter,
    banks: &[BankAccount],
) -> Vec<LitigationCase> {
    let search = filter.search.to_lowercase();
    let status = selected(&filter.status).map(str::to_lowercase);
    let bank = selected(&filter.bank).map(|username| {
        banks
            .iter()
            .find(|account| account.username == username)
            .map(|account| account.bank_name.to_lowercase())
    });

    cases
        .iter()
        .filter(|case| {
            let matches_search = search.is_empty()
                || contains_ci(case.case_no.as_deref(), &search)
                || contains_ci(case.borrower_name.as_deref(), &search);

            let matches_status = status.as_deref().is_none_or(|s| {
                case.status
                    .as_deref()
                    .is_some_and(|cs| cs.to_lowercase() == s)
            });

            let matches_bank = match &bank {
                None => true,
                Some(None) => false,
                Some(Some(name)) => contains_ci(case.bank_name.as_deref(), name),
            };

            matches_search && matches_status && matches_bank
        })
        .cloned()
        .collect()
}

/// Counts per exact status. Cases with another status, or none, only count
/// towards `total`.
pub fn summarize(cases: &[LitigationCase]) -> LitigationSummary {
    let mut summary = LitigationSummary {
        total: cases.len(),
        ..Default::default()
    };
    for case in cases {
        match case.status.as_deref() {
            Some("Pending") => summary.pending += 1,
            Some("Decreed") => summary.decreed += 1,
            Some("Dismissed") => summary.dismissed += 1,
            _ => {}
        }
    }
    summary
}

/// Newest-first litigation cases matching `filter`, with their summary.
pub async fn list_cases(
    backend: &LocalBackend,
    filter: LitigationFilter,
) -> Result<LitigationListing, OfficeError> {
    let (cases, banks) = backend
        .db()
        .call(|db| Ok((db.list_litigation_cases()?, db.list_active_bank_accounts()?)))
        .await
        .map_err(BackendError::Database)?;
    let cases = filter_cases(&cases, &filter, &banks);
    Ok(LitigationListing {
        summary: summarize(&cases),
        cases,
    })
}
