//! Raw case row → display row.

use super::models::{CaseRecord, DisplayRecord, Session};
use super::status::{color_for_status, display_status};

const RUPEE: char = '₹';

/// Project a stored case into its display form for `session`.
pub fn project(raw: CaseRecord, session: &Session) -> DisplayRecord {
    let amount = format_inr(raw.loan_amount);
    let date = raw.effective_date().date_naive();
    let display = effective_status(&raw, session);
    let status_label = display_status(&display, session.admin_scope);
    let status_color = color_for_status(&display);

    DisplayRecord {
        case: raw,
        amount,
        date,
        display_status: display,
        status_label,
        status_color,
    }
}

/// Status as seen by the viewing employee.
///
/// A `redirected` case reads as `redirected to <assignee>` for the employee
/// who handed it off and as `in_review` for the employee who received it.
pub fn effective_status(raw: &CaseRecord, session: &Session) -> String {
    if raw.status != "redirected" {
        return raw.status.clone();
    }
    let Some(viewer) = session.employee.as_deref() else {
        return raw.status.clone();
    };

    if raw.original_assigned_to_username.as_deref() == Some(viewer) {
        format!(
            "redirected to {}",
            raw.assigned_to_username.as_deref().unwrap_or_default()
        )
    } else if raw.assigned_to_username.as_deref() == Some(viewer) {
        "in_review".to_string()
    } else {
        raw.status.clone()
    }
}

/// Format an amount in rupees with Indian digit grouping: the last three
/// integer digits form one group and the rest are grouped in pairs.
/// Up to three fraction digits are kept, trailing zeros dropped.
pub fn format_inr(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("{}0", RUPEE);
    }

    let scaled = (amount.abs() * 1000.0).round() as u128;
    let integer = scaled / 1000;
    let fraction = scaled % 1000;
    let negative = amount < 0.0 && scaled != 0;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push(RUPEE);
    out.push_str(&group_indian(&integer.to_string()));
    if fraction != 0 {
        let digits = format!("{:03}", fraction);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last3) = digits.split_at(digits.len() - 3);

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    let mut out = groups.join(",");
    out.push(',');
    out.push_str(last3);
    out
}
