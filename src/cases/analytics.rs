//! Aggregates behind the dashboard and analytics views.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, TimeZone};
use serde::{Deserialize, Serialize};

use super::models::CaseRecord;
use crate::office::models::{BankAccount, BankCounter, LitigationCase};

/// `application_type` of legal-opinion cases.
pub const LEGAL_OPINION_TYPE: &str = "legal opinion";

/// Cases still open after this long count as delayed.
pub const DELAY_THRESHOLD_DAYS: i64 = 7;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar year, optionally narrowed to one month (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    #[serde(default)]
    pub month: Option<u32>,
}

impl Period {
    pub fn contains<Tz: TimeZone, Tz2: TimeZone>(&self, instant: &DateTime<Tz>, tz: &Tz2) -> bool {
        let local = instant.with_timezone(tz);
        local.year() == self.year && self.month.is_none_or(|m| local.month() == m)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalOpinionStats {
    pub total: usize,
    pub pending: usize,
    pub in_review: usize,
    pub completed: usize,
    pub delayed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStatusCounts {
    pub month: String,
    pub pending: usize,
    pub in_review: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LitigationMonth {
    pub month: String,
    pub pending: usize,
    pub decreed: usize,
    pub dismissed: usize,
}

/// Case and processed-document totals for one bank, or for every bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankOverview {
    pub cases: usize,
    pub documents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankCount {
    pub bank_name: String,
    pub cases: usize,
}

fn is_pending(case: &CaseRecord) -> bool {
    matches!(case.status.as_str(), "to_be_assigned" | "draft")
}

fn is_in_review(case: &CaseRecord) -> bool {
    matches!(case.status.as_str(), "in_review" | "submitted")
}

fn is_completed(case: &CaseRecord) -> bool {
    matches!(case.status.as_str(), "completed" | "closed") || case.digital_signature_applied
}

/// Headline counts for legal-opinion cases created in `period`.
pub fn legal_opinion_stats<Tz: TimeZone>(
    cases: &[CaseRecord],
    period: Period,
    now: &DateTime<Tz>,
) -> LegalOpinionStats {
    let tz = now.timezone();
    let cutoff = now.clone() - Duration::days(DELAY_THRESHOLD_DAYS);
    let mut stats = LegalOpinionStats::default();

    for case in cases
        .iter()
        .filter(|c| c.application_type == LEGAL_OPINION_TYPE && period.contains(&c.created_at, &tz))
    {
        stats.total += 1;
        if is_pending(case) {
            stats.pending += 1;
        }
        if is_in_review(case) {
            stats.in_review += 1;
        }
        if is_completed(case) {
            stats.completed += 1;
        }
        let open = matches!(case.status.as_str(), "to_be_assigned" | "in_review");
        if open && case.created_at < cutoff {
            stats.delayed += 1;
        }
    }
    stats
}

/// Per-month pending / in-review / completed counts of legal-opinion cases
/// for `period.year`, Jan through Dec, or only `period.month` when set.
pub fn legal_opinion_monthly<Tz: TimeZone>(
    cases: &[CaseRecord],
    period: Period,
    tz: &Tz,
) -> Vec<MonthlyStatusCounts> {
    let mut months: Vec<MonthlyStatusCounts> = MONTHS
        .iter()
        .map(|m| MonthlyStatusCounts {
            month: m.to_string(),
            pending: 0,
            in_review: 0,
            completed: 0,
        })
        .collect();

    for case in cases
        .iter()
        .filter(|c| c.application_type == LEGAL_OPINION_TYPE && period.contains(&c.created_at, tz))
    {
        let slot = &mut months[case.created_at.with_timezone(tz).month0() as usize];
        if is_pending(case) {
            slot.pending += 1;
        }
        if is_in_review(case) {
            slot.in_review += 1;
        }
        if is_completed(case) {
            slot.completed += 1;
        }
    }
    select_month(months, period)
}

/// Per-month Pending / Decreed / Dismissed counts of litigation cases. A
/// case without a status counts as Pending; other statuses are not charted.
pub fn litigation_monthly<Tz: TimeZone>(
    cases: &[LitigationCase],
    period: Period,
    tz: &Tz,
) -> Vec<LitigationMonth> {
    let mut months: Vec<LitigationMonth> = MONTHS
        .iter()
        .map(|m| LitigationMonth {
            month: m.to_string(),
            pending: 0,
            decreed: 0,
            dismissed: 0,
        })
        .collect();

    for case in cases.iter().filter(|c| period.contains(&c.created_at, tz)) {
        let slot = &mut months[case.created_at.with_timezone(tz).month0() as usize];
        match case.status.as_deref().unwrap_or("Pending") {
            "Pending" => slot.pending += 1,
            "Decreed" => slot.decreed += 1,
            "Dismissed" => slot.dismissed += 1,
            _ => {}
        }
    }
    select_month(months, period)
}

fn select_month<T>(months: Vec<T>, period: Period) -> Vec<T> {
    match period.month {
        Some(m) if (1..=12).contains(&m) => months.into_iter().skip(m as usize - 1).take(1).collect(),
        _ => months,
    }
}

/// Banks with the most cases created in the current month of `now`,
/// busiest first, ties broken by name.
pub fn top_banks_this_month<Tz: TimeZone>(
    cases: &[CaseRecord],
    now: &DateTime<Tz>,
    limit: usize,
) -> Vec<BankCount> {
    let period = Period {
        year: now.year(),
        month: Some(now.month()),
    };
    let tz = now.timezone();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for case in cases.iter().filter(|c| period.contains(&c.created_at, &tz)) {
        *counts.entry(case.bank_name.as_str()).or_default() += 1;
    }

    let mut banks: Vec<BankCount> = counts
        .into_iter()
        .map(|(bank_name, cases)| BankCount {
            bank_name: bank_name.to_string(),
            cases,
        })
        .collect();
    banks.sort_by(|a, b| b.cases.cmp(&a.cases).then_with(|| a.bank_name.cmp(&b.bank_name)));
    banks.truncate(limit);
    banks
}

/// Totals for `bank`, or for every bank when `None`.
///
/// A bank's cases are those whose bank name contains the account's bank
/// name, ignoring case. Its documents come from the first counter whose
/// bank name does the same.
pub fn bank_overview(
    cases: &[CaseRecord],
    counters: &[BankCounter],
    bank: Option<&BankAccount>,
) -> BankOverview {
    let Some(account) = bank else {
        return BankOverview {
            cases: cases.len(),
            documents: counters.iter().map(|c| c.last_sequence).sum(),
        };
    };
    let needle = account.bank_name.to_lowercase();
    let matches = |name: &str| name.to_lowercase().contains(&needle);
    BankOverview {
        cases: cases.iter().filter(|c| matches(&c.bank_name)).count(),
        documents: counters
            .iter()
            .find(|c| matches(&c.bank_name))
            .map_or(0, |c| c.last_sequence),
    }
}
