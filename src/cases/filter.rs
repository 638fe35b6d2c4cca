//! In-memory multi-criteria filtering of display rows.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::models::DisplayRecord;

/// Status that never appears in a filtered list.
pub const HIDDEN_STATUS: &str = "submitted";

/// Sentinel a client sends for "no restriction" on a select criterion.
pub const ALL: &str = "all";

/// Criteria for [`filter`]. A select criterion of `None`, `"all"` or `""`
/// places no restriction on that column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub application_type: Option<String>,
    #[serde(default)]
    pub employee: Option<String>,
    #[serde(default)]
    pub office_branch: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub admin_scope: bool,
}

/// The restricting value of a select criterion, if any.
///
/// Empty strings and any casing of `"all"` count as unrestricted, so an
/// unset dropdown sent as `?status=` lists everything instead of nothing.
pub fn selected(choice: &Option<String>) -> Option<&str> {
    choice
        .as_deref()
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

impl FilterCriteria {
    /// Collapse empty strings and the `"all"` sentinel to `None` on every
    /// select criterion. [`filter_in`] already treats them that way; this
    /// only tidies the criteria for logging and comparison.
    pub fn normalized(mut self) -> Self {
        for choice in [
            &mut self.bank,
            &mut self.branch,
            &mut self.status,
            &mut self.application_type,
            &mut self.employee,
            &mut self.office_branch,
        ] {
            if selected(choice).is_none() {
                *choice = None;
            }
        }
        self
    }
}

/// Inclusive instant bounds of a calendar-day range in some time zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateBounds {
    /// Start of `start` (00:00:00.000) through end of `end` (23:59:59.999),
    /// both local to `tz`.
    pub fn for_days<Tz: TimeZone>(start: Option<NaiveDate>, end: Option<NaiveDate>, tz: &Tz) -> Self {
        Self {
            start: start.and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0)).map(|dt| local_instant(dt, tz, true)),
            end: end
                .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
                .map(|dt| local_instant(dt, tz, false)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        let instant = instant.with_timezone(&Utc);
        self.start.is_none_or(|s| instant >= s) && self.end.is_none_or(|e| instant <= e)
    }
}

fn local_instant<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz, earliest: bool) -> DateTime<Utc> {
    let mapped = tz.from_local_datetime(&naive);
    let resolved = if earliest { mapped.earliest() } else { mapped.latest() };
    match resolved {
        Some(dt) => dt.with_timezone(&Utc),
        // wall-clock time skipped by a DST jump
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Filter `records` in the viewer's local time zone.
pub fn filter(records: &[DisplayRecord], criteria: &FilterCriteria) -> Vec<DisplayRecord> {
    filter_in(records, criteria, &Local)
}

/// Filter `records`, resolving the date range in `tz`. Relative order of
/// the input is preserved and nothing is mutated.
pub fn filter_in<Tz: TimeZone>(
    records: &[DisplayRecord],
    criteria: &FilterCriteria,
    tz: &Tz,
) -> Vec<DisplayRecord> {
    let bounds = DateBounds::for_days(criteria.start_date, criteria.end_date, tz);
    let search = criteria.search.to_lowercase();
    let bank = selected(&criteria.bank).map(str::to_lowercase);
    let branch = selected(&criteria.branch).map(str::to_lowercase);
    let status = selected(&criteria.status);
    let application_type = selected(&criteria.application_type);
    let employee = selected(&criteria.employee);
    let office_branch = selected(&criteria.office_branch);

    records
        .iter()
        .filter(|r| {
            let case = &r.case;

            let matches_search = search.is_empty()
                || case.borrower_name.to_lowercase().contains(&search)
                || case.application_id.to_lowercase().contains(&search)
                || case.bank_name.to_lowercase().contains(&search);

            let matches_bank = bank
                .as_deref()
                .is_none_or(|b| case.bank_name.to_lowercase().contains(b));

            let matches_branch = branch.as_deref().is_none_or(|b| {
                case.branch_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(b))
            });

            let matches_status = status.is_none_or(|s| case.status == s);

            let matches_type =
                criteria.admin_scope || application_type.is_none_or(|t| case.application_type == t);

            let matches_employee =
                employee.is_none_or(|e| case.assigned_to_username.as_deref() == Some(e));

            let matches_office =
                office_branch.is_none_or(|o| case.office_branch.as_deref() == Some(o));

            let visible = case.status != HIDDEN_STATUS;

            let in_range = bounds.is_unbounded() || bounds.contains(&case.effective_date());

            matches_search
                && matches_bank
                && matches_branch
                && matches_status
                && matches_type
                && matches_employee
                && matches_office
                && visible
                && in_range
        })
        .cloned()
        .collect()
}
