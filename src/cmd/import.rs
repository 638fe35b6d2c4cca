//! Bulk case import: `casedesk import <FILE>`.
//!
//! The file is a JSON array of case objects with the same fields as the
//! `applications` table, minus `id`. Statuses are validated before anything
//! is written, and the whole file is imported in one transaction.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use casedesk::backend::db::CaseDb;
use casedesk::cases::models::{CaseStatus, NewCase};
use casedesk::config::AppConfig;

pub fn cmd_import(config: &AppConfig, file: &Path, db_path: Option<PathBuf>) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let cases: Vec<NewCase> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as a JSON array of cases", file.display()))?;

    for case in &cases {
        if let Err(msg) = CaseStatus::from_str(&case.status) {
            bail!("Application {}: {}", case.application_id, msg);
        }
    }

    let db_path = db_path.unwrap_or_else(|| config.database.path.clone());
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = CaseDb::new(&db_path).context("Failed to open case database")?;

    let saved = db.insert_cases(&cases)?;
    for case in &saved {
        debug!(id = %case.id, application_id = %case.application_id, "Imported application");
    }
    let total = db.count_cases()?;

    info!(imported = cases.len(), total, "Import finished");
    println!(
        "Imported {} applications into {} ({} total)",
        cases.len(),
        db_path.display(),
        total
    );
    Ok(())
}
