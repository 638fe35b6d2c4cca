//! Integration tests for the casedesk binary.
//!
//! These run the real CLI against temporary directories.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use casedesk::backend::db::CaseDb;
use casedesk::backend::{CaseColumn, CaseQuery};

/// Helper to create a casedesk Command isolated from the caller's environment.
fn casedesk(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("casedesk");
    cmd.current_dir(dir.path())
        .env_remove("CASEDESK_PORT")
        .env_remove("CASEDESK_DB_PATH")
        .env_remove("CASEDESK_STORAGE_ROOT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_cases(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("cases.json");
    fs::write(&path, body).unwrap();
    path
}

const CASES_JSON: &str = r#"[
  {
    "application_id": "APP-100",
    "borrower_name": "Meera Iyer",
    "bank_name": "SBI",
    "loan_amount": 2500000,
    "loan_type": "home",
    "application_type": "legal opinion",
    "status": "to_be_assigned",
    "created_at": "2024-04-01T09:00:00+05:30"
  },
  {
    "application_id": "APP-101",
    "borrower_name": "Arjun Rao",
    "bank_name": "HDFC Bank Ltd",
    "branch_name": "Andheri",
    "loan_amount": 1640000.5,
    "loan_type": "mortgage",
    "application_type": "legal opinion",
    "status": "in_review",
    "assigned_to_username": "asha"
  }
]"#;

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_casedesk_help() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("import"));
    }

    #[test]
    fn test_casedesk_version() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir).arg("frobnicate").assert().failure();
    }
}

// =============================================================================
// Database initialization
// =============================================================================

mod init {
    use super::*;

    #[test]
    fn test_init_creates_default_database() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Database initialized"));

        assert!(dir.path().join(".casedesk/casedesk.db").exists());
        assert!(dir.path().join(".casedesk/storage").is_dir());
    }

    #[test]
    fn test_init_with_db_path() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .args(["init", "--db-path", "data/office.db"])
            .assert()
            .success();
        assert!(dir.path().join("data/office.db").exists());
        assert!(dir.path().join("data/storage").is_dir());
    }

    #[test]
    fn test_init_respects_env_override() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .env("CASEDESK_DB_PATH", "env/cases.db")
            .arg("init")
            .assert()
            .success();
        assert!(dir.path().join("env/cases.db").exists());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir).arg("init").assert().success();
        casedesk(&dir).arg("init").assert().success();
    }
}

// =============================================================================
// Import
// =============================================================================

mod import {
    use super::*;

    #[test]
    fn test_import_cases() {
        let dir = TempDir::new().unwrap();
        let file = write_cases(&dir, CASES_JSON);

        casedesk(&dir)
            .args(["import", file.to_str().unwrap(), "--db-path", "cases.db"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Imported 2 applications"));

        let db = CaseDb::new(&dir.path().join("cases.db")).unwrap();
        let cases = db
            .list_cases(&CaseQuery::all().order_by(CaseColumn::ApplicationId, false))
            .unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].application_id, "APP-100");
        assert_eq!(cases[1].assigned_to_username.as_deref(), Some("asha"));
    }

    #[test]
    fn test_import_duplicate_application_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let file = write_cases(&dir, CASES_JSON);
        casedesk(&dir)
            .args(["import", file.to_str().unwrap(), "--db-path", "cases.db"])
            .assert()
            .success();

        casedesk(&dir)
            .args(["import", file.to_str().unwrap(), "--db-path", "cases.db"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("APP-100"));

        let db = CaseDb::new(&dir.path().join("cases.db")).unwrap();
        assert_eq!(db.count_cases().unwrap(), 2);
    }

    #[test]
    fn test_import_rejects_unknown_status() {
        let dir = TempDir::new().unwrap();
        let file = write_cases(
            &dir,
            r#"[{"application_id": "APP-9", "borrower_name": "X", "bank_name": "SBI",
                 "loan_amount": 1, "loan_type": "home", "application_type": "legal opinion",
                 "status": "archived"}]"#,
        );

        casedesk(&dir)
            .args(["import", file.to_str().unwrap(), "--db-path", "cases.db"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("APP-9"));

        assert!(!dir.path().join("cases.db").exists());
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let file = write_cases(&dir, "{not json");
        casedesk(&dir)
            .args(["import", file.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("JSON array"));
    }

    #[test]
    fn test_import_missing_file() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .args(["import", "nope.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No casedesk.toml found"))
            .stdout(predicate::str::contains("port = 3141"));
    }

    #[test]
    fn test_config_init_then_show() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created casedesk.toml"));
        assert!(dir.path().join(".casedesk/casedesk.toml").exists());

        casedesk(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        casedesk(&dir)
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("Config file:"));
    }

    #[test]
    fn test_config_show_env_override() {
        let dir = TempDir::new().unwrap();
        casedesk(&dir)
            .env("CASEDESK_PORT", "9090")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 9090"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[server]\nport = 0\n\n[logging]\nlevel = \"info\"\n").unwrap();

        casedesk(&dir)
            .args(["--config", path.to_str().unwrap(), "config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("port"));
    }

    #[test]
    fn test_config_validate_clean_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[server]\nport = 8080\n").unwrap();

        casedesk(&dir)
            .args(["--config", path.to_str().unwrap(), "config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"));
    }

    #[test]
    fn test_invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        casedesk(&dir)
            .args(["--config", path.to_str().unwrap(), "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse casedesk.toml"));
    }
}
