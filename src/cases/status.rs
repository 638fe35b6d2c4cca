//! Status vocabulary: presentation color and human label for a raw status.

use serde::{Deserialize, Serialize};

const REDIRECTED_TO_PREFIX: &str = "redirected to ";

/// Presentation color token for a status badge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Amber,
    Red,
    Yellow,
    Emerald,
    Blue,
    Gray,
    Purple,
    Default,
}

impl StatusColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Amber => "amber",
            StatusColor::Red => "red",
            StatusColor::Yellow => "yellow",
            StatusColor::Emerald => "emerald",
            StatusColor::Blue => "blue",
            StatusColor::Gray => "gray",
            StatusColor::Purple => "purple",
            StatusColor::Default => "default",
        }
    }
}

impl std::fmt::Display for StatusColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a status (any case) to its badge color. Empty and unknown statuses
/// get [`StatusColor::Default`].
pub fn color_for_status(status: &str) -> StatusColor {
    let status = status.to_lowercase();
    match status.as_str() {
        "to be assigned" | "to_be_assigned" => StatusColor::Amber,
        "in_review" | "under review" => StatusColor::Red,
        "waiting for approval" | "waiting_for_approval" => StatusColor::Yellow,
        "completed" | "approved" => StatusColor::Emerald,
        "rejected" => StatusColor::Red,
        "submitted" => StatusColor::Blue,
        "pending documents" => StatusColor::Amber,
        "draft" => StatusColor::Gray,
        "redirected" => StatusColor::Purple,
        s if s.starts_with(REDIRECTED_TO_PREFIX) => StatusColor::Purple,
        _ => StatusColor::Default,
    }
}

/// Human label for a status.
///
/// The administrative view has fixed labels for the common statuses; every
/// other status is lower-cased, gets its first character upper-cased, and
/// has underscores after the first character turned into spaces.
pub fn display_status(status: &str, admin_scope: bool) -> String {
    if status.is_empty() {
        return String::new();
    }
    let status = status.to_lowercase();

    if admin_scope {
        let label = match status.as_str() {
            "to_be_assigned" => Some("To be assigned"),
            "submitted" => Some("Submitted"),
            "in_review" => Some("Under Review"),
            "completed" => Some("Completed"),
            "rejected" => Some("Rejected"),
            "redirected" => Some("Redirected"),
            _ => None,
        };
        if let Some(label) = label {
            return label.to_string();
        }
        if status.starts_with(REDIRECTED_TO_PREFIX) {
            return capitalize_first(&status);
        }
    }

    let mut chars = status.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.as_str().replace('_', " ");
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
