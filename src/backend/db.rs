use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::{CaseColumn, CaseQuery, Predicate};
use crate::cases::models::{CaseRecord, NewCase};
use crate::office::models::{
    BankAccount, BankCounter, CatalogEntry, CatalogKind, ContactForm, ContactSubmission,
    EmployeeAccount, GalleryImage, LitigationCase, NewLitigationCase,
};

/// Async-safe handle to the case database.
///
/// Wraps `CaseDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<CaseDb>>,
}

impl DbHandle {
    pub fn new(db: CaseDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&CaseDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. For startup, CLI commands
    /// and tests; never from a hot async path.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, CaseDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

const CASE_COLUMNS: &str = "id, application_id, borrower_name, bank_name, branch_name, \
     loan_amount, loan_type, application_type, status, submission_date, created_at, \
     assigned_to_username, original_assigned_to_username, office_branch, \
     digital_signature_applied";

pub struct CaseDb {
    conn: Connection,
}

impl CaseDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS applications (
                    id TEXT PRIMARY KEY,
                    application_id TEXT NOT NULL UNIQUE,
                    borrower_name TEXT NOT NULL,
                    bank_name TEXT NOT NULL,
                    branch_name TEXT,
                    loan_amount REAL NOT NULL DEFAULT 0,
                    loan_type TEXT NOT NULL DEFAULT '',
                    application_type TEXT NOT NULL DEFAULT '',
                    status TEXT NOT NULL,
                    submission_date TEXT,
                    created_at TEXT NOT NULL,
                    assigned_to_username TEXT,
                    original_assigned_to_username TEXT,
                    office_branch TEXT,
                    digital_signature_applied INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS employee_accounts (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    is_active INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS bank_accounts (
                    username TEXT PRIMARY KEY,
                    bank_name TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS contact_submissions (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    phone_number TEXT,
                    message TEXT,
                    document_url TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS gallery_images (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    storage_path TEXT NOT NULL,
                    image_url TEXT NOT NULL,
                    display_order INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS litigation_cases (
                    id TEXT PRIMARY KEY,
                    case_no TEXT,
                    borrower_name TEXT,
                    bank_name TEXT,
                    status TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS loan_types (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS application_types (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS bank_application_counters (
                    bank_name TEXT PRIMARY KEY,
                    last_sequence INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
                CREATE INDEX IF NOT EXISTS idx_applications_assigned ON applications(assigned_to_username);
                CREATE INDEX IF NOT EXISTS idx_applications_original ON applications(original_assigned_to_username);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Case CRUD ─────────────────────────────────────────────────────

    pub fn insert_case(&self, case: &NewCase) -> Result<CaseRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = case.created_at.unwrap_or_else(now);
        self.conn
            .execute(
                "INSERT INTO applications (id, application_id, borrower_name, bank_name, \
                 branch_name, loan_amount, loan_type, application_type, status, \
                 submission_date, created_at, assigned_to_username, \
                 original_assigned_to_username, office_branch, digital_signature_applied) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    id,
                    case.application_id,
                    case.borrower_name,
                    case.bank_name,
                    case.branch_name,
                    case.loan_amount,
                    case.loan_type,
                    case.application_type,
                    case.status,
                    case.submission_date.map(|d| timestamp(&d)),
                    timestamp(&created_at),
                    case.assigned_to_username,
                    case.original_assigned_to_username,
                    case.office_branch,
                    case.digital_signature_applied,
                ],
            )
            .with_context(|| format!("Failed to insert application {}", case.application_id))?;
        self.get_case(&id)?
            .context("Inserted application vanished")
    }

    /// Insert several cases in one transaction; nothing is written if any
    /// insert fails.
    pub fn insert_cases(&self, cases: &[NewCase]) -> Result<Vec<CaseRecord>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin import transaction")?;
        let saved = cases
            .iter()
            .map(|case| self.insert_case(case))
            .collect::<Result<Vec<_>>>()?;
        tx.commit().context("Failed to commit import transaction")?;
        Ok(saved)
    }

    pub fn get_case(&self, id: &str) -> Result<Option<CaseRecord>> {
        let sql = format!("SELECT {} FROM applications WHERE id = ?1", CASE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], CaseRow::from_row)
            .optional()
            .context("Failed to get application")?;
        row.map(CaseRow::into_case).transpose()
    }

    pub fn list_cases(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>> {
        let mut values: Vec<String> = Vec::new();
        let mut sql = format!("SELECT {} FROM applications", CASE_COLUMNS);

        if !query.predicates.is_empty() {
            let clauses: Vec<String> = query
                .predicates
                .iter()
                .map(|p| predicate_sql(p, &mut values))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if let Some(order) = query.order {
            let direction = if order.descending { "DESC" } else { "ASC" };
            sql.push_str(&format!(
                " ORDER BY {} {}",
                order_expr(order.column),
                direction
            ));
        }

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list applications query")?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), CaseRow::from_row)
            .context("Failed to query applications")?;

        let mut cases = Vec::new();
        for row in rows {
            let row = row.context("Failed to read application row")?;
            cases.push(row.into_case()?);
        }
        Ok(cases)
    }

    /// Set a case's status. Returns the updated row, or `None` when no row
    /// has that id.
    pub fn update_case_status(&self, id: &str, status: &str) -> Result<Option<CaseRecord>> {
        let changed = self
            .conn
            .execute(
                "UPDATE applications SET status = ?1 WHERE id = ?2",
                params![status, id],
            )
            .context("Failed to update application status")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_case(id)
    }

    pub fn count_cases(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM applications", [], |row| row.get(0))
            .context("Failed to count applications")
    }

    // ── Employees and bank accounts ──────────────────────────────────

    pub fn create_employee(&self, username: &str, is_active: bool) -> Result<EmployeeAccount> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO employee_accounts (id, username, is_active) VALUES (?1, ?2, ?3)",
                params![id, username, is_active],
            )
            .with_context(|| format!("Failed to create employee {}", username))?;
        Ok(EmployeeAccount {
            id,
            username: username.to_string(),
            is_active,
        })
    }

    pub fn list_active_employees(&self) -> Result<Vec<EmployeeAccount>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, username, is_active FROM employee_accounts \
                 WHERE is_active = 1 ORDER BY username",
            )
            .context("Failed to prepare list employees query")?;
        let employees = stmt
            .query_map([], |row| {
                Ok(EmployeeAccount {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    is_active: row.get(2)?,
                })
            })
            .context("Failed to query employees")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read employee row")?;
        Ok(employees)
    }

    pub fn create_bank_account(
        &self,
        username: &str,
        bank_name: &str,
        is_active: bool,
    ) -> Result<BankAccount> {
        self.conn
            .execute(
                "INSERT INTO bank_accounts (username, bank_name, is_active) VALUES (?1, ?2, ?3)",
                params![username, bank_name, is_active],
            )
            .with_context(|| format!("Failed to create bank account {}", username))?;
        Ok(BankAccount {
            username: username.to_string(),
            bank_name: bank_name.to_string(),
            is_active,
        })
    }

    pub fn list_active_bank_accounts(&self) -> Result<Vec<BankAccount>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT username, bank_name, is_active FROM bank_accounts \
                 WHERE is_active = 1 ORDER BY username",
            )
            .context("Failed to prepare list bank accounts query")?;
        let accounts = stmt
            .query_map([], |row| {
                Ok(BankAccount {
                    username: row.get(0)?,
                    bank_name: row.get(1)?,
                    is_active: row.get(2)?,
                })
            })
            .context("Failed to query bank accounts")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read bank account row")?;
        Ok(accounts)
    }

    // ── Contact submissions ──────────────────────────────────────────

    pub fn insert_contact_submission(
        &self,
        form: &ContactForm,
        document_url: Option<&str>,
    ) -> Result<ContactSubmission> {
        let submission = ContactSubmission {
            id: uuid::Uuid::new_v4().to_string(),
            name: form.name.clone(),
            email: form.email.clone(),
            phone_number: form.phone_number.clone(),
            message: form.message.clone(),
            document_url: document_url.map(str::to_string),
            created_at: now(),
        };
        self.conn
            .execute(
                "INSERT INTO contact_submissions \
                 (id, name, email, phone_number, message, document_url, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    submission.id,
                    submission.name,
                    submission.email,
                    submission.phone_number,
                    submission.message,
                    submission.document_url,
                    timestamp(&submission.created_at),
                ],
            )
            .context("Failed to insert contact submission")?;
        Ok(submission)
    }

    /// All contact submissions, newest first.
    pub fn list_contact_submissions(&self) -> Result<Vec<ContactSubmission>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, email, phone_number, message, document_url, created_at \
                 FROM contact_submissions ORDER BY julianday(created_at) DESC",
            )
            .context("Failed to prepare list contact submissions query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .context("Failed to query contact submissions")?;

        let mut submissions = Vec::new();
        for row in rows {
            let (id, name, email, phone_number, message, document_url, created_at) =
                row.context("Failed to read contact submission row")?;
            submissions.push(ContactSubmission {
                id,
                name,
                email,
                phone_number,
                message,
                document_url,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(submissions)
    }

    // ── Gallery ──────────────────────────────────────────────────────

    pub fn insert_gallery_image(
        &self,
        title: &str,
        storage_path: &str,
        image_url: &str,
        display_order: i64,
    ) -> Result<GalleryImage> {
        let image = GalleryImage {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            storage_path: storage_path.to_string(),
            image_url: image_url.to_string(),
            display_order,
            created_at: now(),
        };
        self.conn
            .execute(
                "INSERT INTO gallery_images \
                 (id, title, storage_path, image_url, display_order, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    image.id,
                    image.title,
                    image.storage_path,
                    image.image_url,
                    image.display_order,
                    timestamp(&image.created_at),
                ],
            )
            .context("Failed to insert gallery image")?;
        Ok(image)
    }

    /// Gallery images by display order, newest first within the same slot.
    pub fn list_gallery_images(&self) -> Result<Vec<GalleryImage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, storage_path, image_url, display_order, created_at \
                 FROM gallery_images ORDER BY display_order, julianday(created_at) DESC",
            )
            .context("Failed to prepare list gallery query")?;
        let rows = stmt
            .query_map([], GalleryRow::from_row)
            .context("Failed to query gallery images")?;
        let mut images = Vec::new();
        for row in rows {
            images.push(row.context("Failed to read gallery row")?.into_image()?);
        }
        Ok(images)
    }

    pub fn get_gallery_image(&self, id: &str) -> Result<Option<GalleryImage>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, storage_path, image_url, display_order, created_at \
                 FROM gallery_images WHERE id = ?1",
                params![id],
                GalleryRow::from_row,
            )
            .optional()
            .context("Failed to get gallery image")?;
        row.map(GalleryRow::into_image).transpose()
    }

    pub fn update_gallery_title(&self, id: &str, title: &str) -> Result<Option<GalleryImage>> {
        let changed = self
            .conn
            .execute(
                "UPDATE gallery_images SET title = ?1 WHERE id = ?2",
                params![title, id],
            )
            .context("Failed to update gallery image")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_gallery_image(id)
    }

    pub fn max_gallery_order(&self) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(display_order), 0) FROM gallery_images",
                [],
                |row| row.get(0),
            )
            .context("Failed to read gallery order")
    }

    pub fn delete_gallery_image(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM gallery_images WHERE id = ?1", params![id])
            .context("Failed to delete gallery image")?;
        Ok(changed > 0)
    }

    // ── Litigation ───────────────────────────────────────────────────

    pub fn insert_litigation_case(&self, case: &NewLitigationCase) -> Result<LitigationCase> {
        let record = LitigationCase {
            id: uuid::Uuid::new_v4().to_string(),
            case_no: case.case_no.clone(),
            borrower_name: case.borrower_name.clone(),
            bank_name: case.bank_name.clone(),
            status: case.status.clone(),
            created_at: case.created_at.unwrap_or_else(now),
        };
        self.conn
            .execute(
                "INSERT INTO litigation_cases \
                 (id, case_no, borrower_name, bank_name, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.case_no,
                    record.borrower_name,
                    record.bank_name,
                    record.status,
                    timestamp(&record.created_at),
                ],
            )
            .context("Failed to insert litigation case")?;
        Ok(record)
    }

    pub fn list_litigation_cases(&self) -> Result<Vec<LitigationCase>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, case_no, borrower_name, bank_name, status, created_at \
                 FROM litigation_cases ORDER BY julianday(created_at) DESC",
            )
            .context("Failed to prepare list litigation query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .context("Failed to query litigation cases")?;

        let mut cases = Vec::new();
        for row in rows {
            let (id, case_no, borrower_name, bank_name, status, created_at) =
                row.context("Failed to read litigation row")?;
            cases.push(LitigationCase {
                id,
                case_no,
                borrower_name,
                bank_name,
                status,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(cases)
    }

    // ── Loan and application types ───────────────────────────────────

    pub fn insert_catalog_entry(&self, kind: CatalogKind, name: &str) -> Result<CatalogEntry> {
        let entry = CatalogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now(),
        };
        let sql = format!(
            "INSERT INTO {} (id, name, created_at) VALUES (?1, ?2, ?3)",
            kind.table()
        );
        self.conn
            .execute(&sql, params![entry.id, entry.name, timestamp(&entry.created_at)])
            .with_context(|| format!("Failed to insert {}", kind.label()))?;
        Ok(entry)
    }

    /// Entries of one catalog, newest first.
    pub fn list_catalog_entries(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>> {
        let sql = format!(
            "SELECT id, name, created_at FROM {} ORDER BY julianday(created_at) DESC, rowid DESC",
            kind.table()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Failed to prepare list {} query", kind.label()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .with_context(|| format!("Failed to query {}", kind.table()))?;
        let mut entries = Vec::new();
        for row in rows {
            let (id, name, created_at) = row.context("Failed to read catalog row")?;
            entries.push(CatalogEntry {
                id,
                name,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(entries)
    }

    pub fn get_catalog_entry(&self, kind: CatalogKind, id: &str) -> Result<Option<CatalogEntry>> {
        let sql = format!("SELECT id, name, created_at FROM {} WHERE id = ?1", kind.table());
        let row = self
            .conn
            .query_row(&sql, params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .optional()
            .with_context(|| format!("Failed to get {}", kind.label()))?;
        row.map(|(id, name, created_at)| {
            Ok(CatalogEntry {
                id,
                name,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    pub fn rename_catalog_entry(
        &self,
        kind: CatalogKind,
        id: &str,
        name: &str,
    ) -> Result<Option<CatalogEntry>> {
        let sql = format!("UPDATE {} SET name = ?1 WHERE id = ?2", kind.table());
        let changed = self
            .conn
            .execute(&sql, params![name, id])
            .with_context(|| format!("Failed to rename {}", kind.label()))?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_catalog_entry(kind, id)
    }

    pub fn delete_catalog_entry(&self, kind: CatalogKind, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
        let changed = self
            .conn
            .execute(&sql, params![id])
            .with_context(|| format!("Failed to delete {}", kind.label()))?;
        Ok(changed > 0)
    }

    // ── Bank document counters ───────────────────────────────────────

    /// Insert or overwrite the counter for `bank_name`.
    pub fn set_bank_counter(&self, bank_name: &str, last_sequence: i64) -> Result<BankCounter> {
        self.conn
            .execute(
                "INSERT INTO bank_application_counters (bank_name, last_sequence) VALUES (?1, ?2) \
                 ON CONFLICT(bank_name) DO UPDATE SET last_sequence = excluded.last_sequence",
                params![bank_name, last_sequence],
            )
            .with_context(|| format!("Failed to set counter for {}", bank_name))?;
        Ok(BankCounter {
            bank_name: bank_name.to_string(),
            last_sequence,
        })
    }

    /// All counters ordered by bank name.
    pub fn list_bank_counters(&self) -> Result<Vec<BankCounter>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT bank_name, last_sequence FROM bank_application_counters \
                 ORDER BY bank_name",
            )
            .context("Failed to prepare list bank counters query")?;
        let counters = stmt
            .query_map([], |row| {
                Ok(BankCounter {
                    bank_name: row.get(0)?,
                    last_sequence: row.get(1)?,
                })
            })
            .context("Failed to query bank counters")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read bank counter row")?;
        Ok(counters)
    }
}

// ── Query building ────────────────────────────────────────────────────

fn predicate_sql(predicate: &Predicate, values: &mut Vec<String>) -> String {
    match predicate {
        Predicate::Eq(column, value) => {
            values.push(value.clone());
            format!("{} = ?", column.as_str())
        }
        Predicate::In(column, options) => {
            if options.is_empty() {
                return "0".to_string();
            }
            values.extend(options.iter().cloned());
            let placeholders = vec!["?"; options.len()].join(", ");
            format!("{} IN ({})", column.as_str(), placeholders)
        }
        Predicate::Or(inner) => {
            if inner.is_empty() {
                return "0".to_string();
            }
            let parts: Vec<String> = inner.iter().map(|p| predicate_sql(p, values)).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

fn order_expr(column: CaseColumn) -> String {
    match column {
        CaseColumn::CreatedAt | CaseColumn::SubmissionDate => {
            format!("julianday({})", column.as_str())
        }
        other => other.as_str().to_string(),
    }
}

// ── Internal row helpers ──────────────────────────────────────────────

fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

fn timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).with_context(|| format!("Invalid stored timestamp: {}", s))
}

struct CaseRow {
    id: String,
    application_id: String,
    borrower_name: String,
    bank_name: String,
    branch_name: Option<String>,
    loan_amount: f64,
    loan_type: String,
    application_type: String,
    status: String,
    submission_date: Option<String>,
    created_at: String,
    assigned_to_username: Option<String>,
    original_assigned_to_username: Option<String>,
    office_branch: Option<String>,
    digital_signature_applied: bool,
}

impl CaseRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            application_id: row.get(1)?,
            borrower_name: row.get(2)?,
            bank_name: row.get(3)?,
            branch_name: row.get(4)?,
            loan_amount: row.get(5)?,
            loan_type: row.get(6)?,
            application_type: row.get(7)?,
            status: row.get(8)?,
            submission_date: row.get(9)?,
            created_at: row.get(10)?,
            assigned_to_username: row.get(11)?,
            original_assigned_to_username: row.get(12)?,
            office_branch: row.get(13)?,
            digital_signature_applied: row.get(14)?,
        })
    }

    fn into_case(self) -> Result<CaseRecord> {
        let submission_date = self
            .submission_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        Ok(CaseRecord {
            created_at: parse_timestamp(&self.created_at)?,
            submission_date,
            id: self.id,
            application_id: self.application_id,
            borrower_name: self.borrower_name,
            bank_name: self.bank_name,
            branch_name: self.branch_name,
            loan_amount: self.loan_amount,
            loan_type: self.loan_type,
            application_type: self.application_type,
            status: self.status,
            assigned_to_username: self.assigned_to_username,
            original_assigned_to_username: self.original_assigned_to_username,
            office_branch: self.office_branch,
            digital_signature_applied: self.digital_signature_applied,
        })
    }
}

struct GalleryRow {
    id: String,
    title: String,
    storage_path: String,
    image_url: String,
    display_order: i64,
    created_at: String,
}

impl GalleryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            storage_path: row.get(2)?,
            image_url: row.get(3)?,
            display_order: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_image(self) -> Result<GalleryImage> {
        Ok(GalleryImage {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            title: self.title,
            storage_path: self.storage_path,
            image_url: self.image_url,
            display_order: self.display_order,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cases::models::Session;

    pub(crate) fn new_case(app: &str, status: &str, created_at: &str) -> NewCase {
        NewCase {
            application_id: app.to_string(),
            borrower_name: format!("Borrower {app}"),
            bank_name: "HDFC Bank Ltd".to_string(),
            branch_name: Some("Andheri".to_string()),
            loan_amount: 1_640_000.0,
            loan_type: "home".to_string(),
            application_type: "legal_opinion".to_string(),
            status: status.to_string(),
            submission_date: Some(DateTime::parse_from_rfc3339(created_at).unwrap()),
            created_at: Some(DateTime::parse_from_rfc3339(created_at).unwrap()),
            assigned_to_username: None,
            original_assigned_to_username: None,
            office_branch: Some("Mumbai".to_string()),
            digital_signature_applied: false,
        }
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let tables: Vec<String> = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for table in [
            "applications",
            "bank_accounts",
            "contact_submissions",
            "employee_accounts",
            "gallery_images",
            "litigation_cases",
            "loan_types",
            "application_types",
            "bank_application_counters",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
        Ok(())
    }

    #[test]
    fn test_migrations_are_idempotent() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        db.run_migrations()?;
        Ok(())
    }

    #[test]
    fn test_insert_and_get_case() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let inserted = db.insert_case(&new_case("LO-1", "in_review", "2024-03-05T23:45:00+05:30"))?;
        let fetched = db.get_case(&inserted.id)?.unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.application_id, "LO-1");
        assert_eq!(fetched.loan_amount, 1_640_000.0);
        // offset survives storage
        assert_eq!(fetched.submission_date.unwrap().offset().local_minus_utc(), 19800);
        Ok(())
    }

    #[test]
    fn test_get_case_missing() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        assert!(db.get_case("nope")?.is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_application_id_rejected() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        db.insert_case(&new_case("LO-1", "draft", "2024-01-01T00:00:00Z"))?;
        assert!(db.insert_case(&new_case("LO-1", "draft", "2024-01-02T00:00:00Z")).is_err());
        Ok(())
    }

    #[test]
    fn test_insert_cases_is_atomic() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let batch = [
            new_case("LO-1", "draft", "2024-01-01T00:00:00Z"),
            new_case("LO-2", "draft", "2024-01-02T00:00:00Z"),
        ];
        assert_eq!(db.insert_cases(&batch)?.len(), 2);

        let clashing = [
            new_case("LO-3", "draft", "2024-01-03T00:00:00Z"),
            new_case("LO-1", "draft", "2024-01-04T00:00:00Z"),
        ];
        assert!(db.insert_cases(&clashing).is_err());
        assert_eq!(db.count_cases()?, 2);
        assert!(
            db.list_cases(&CaseQuery::all())?
                .iter()
                .all(|c| c.application_id != "LO-3")
        );
        Ok(())
    }

    #[test]
    fn test_list_cases_orders_by_instant_not_text() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        // 10:00+05:30 is 04:30Z, earlier than 05:00Z
        db.insert_case(&new_case("LO-A", "in_review", "2024-03-01T10:00:00+05:30"))?;
        db.insert_case(&new_case("LO-B", "in_review", "2024-03-01T05:00:00Z"))?;
        db.insert_case(&new_case("LO-C", "in_review", "2024-02-28T00:00:00Z"))?;

        let query = CaseQuery::all().order_by(CaseColumn::CreatedAt, true);
        let apps: Vec<String> = db
            .list_cases(&query)?
            .into_iter()
            .map(|c| c.application_id)
            .collect();
        assert_eq!(apps, vec!["LO-B", "LO-A", "LO-C"]);
        Ok(())
    }

    #[test]
    fn test_list_cases_with_predicates() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let mut mine = new_case("LO-1", "in_review", "2024-03-01T00:00:00Z");
        mine.assigned_to_username = Some("alice".into());
        let mut handed_off = new_case("LO-2", "redirected", "2024-03-02T00:00:00Z");
        handed_off.assigned_to_username = Some("bob".into());
        handed_off.original_assigned_to_username = Some("alice".into());
        let mut other = new_case("LO-3", "in_review", "2024-03-03T00:00:00Z");
        other.assigned_to_username = Some("carol".into());
        db.insert_case(&mine)?;
        db.insert_case(&handed_off)?;
        db.insert_case(&other)?;
        db.insert_case(&new_case("LO-4", "submitted", "2024-03-04T00:00:00Z"))?;

        let alice = db.list_cases(&CaseQuery::for_session(&Session::employee("alice")))?;
        let apps: Vec<&str> = alice.iter().map(|c| c.application_id.as_str()).collect();
        assert_eq!(apps, vec!["LO-2", "LO-1"]);

        let admin = db.list_cases(&CaseQuery::for_session(&Session::admin()))?;
        let apps: Vec<&str> = admin.iter().map(|c| c.application_id.as_str()).collect();
        assert_eq!(apps, vec!["LO-3", "LO-2", "LO-1"]);
        Ok(())
    }

    #[test]
    fn test_empty_in_predicate_matches_nothing() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        db.insert_case(&new_case("LO-1", "in_review", "2024-03-01T00:00:00Z"))?;
        let query = CaseQuery::all().filter(Predicate::In(CaseColumn::Status, vec![]));
        assert!(db.list_cases(&query)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_update_case_status() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let case = db.insert_case(&new_case("LO-1", "in_review", "2024-03-01T00:00:00Z"))?;
        let updated = db.update_case_status(&case.id, "completed")?.unwrap();
        assert_eq!(updated.status, "completed");
        assert_eq!(updated.application_id, "LO-1");
        assert!(db.update_case_status("missing", "completed")?.is_none());
        Ok(())
    }

    #[test]
    fn test_active_employees_sorted() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        db.create_employee("zara", true)?;
        db.create_employee("amit", true)?;
        db.create_employee("old", false)?;
        let names: Vec<String> = db
            .list_active_employees()?
            .into_iter()
            .map(|e| e.username)
            .collect();
        assert_eq!(names, vec!["amit", "zara"]);
        Ok(())
    }

    #[test]
    fn test_active_bank_accounts_sorted() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        db.create_bank_account("sbi_ops", "State Bank of India", true)?;
        db.create_bank_account("hdfc_legal", "HDFC Bank", true)?;
        db.create_bank_account("closed", "Old Bank", false)?;
        let accounts = db.list_active_bank_accounts()?;
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].username, "hdfc_legal");
        assert_eq!(accounts[1].bank_name, "State Bank of India");
        Ok(())
    }

    #[test]
    fn test_contact_submissions_roundtrip() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let form = ContactForm {
            name: "Priya".into(),
            email: "priya@example.com".into(),
            phone_number: Some("9876543210".into()),
            message: None,
        };
        let saved = db.insert_contact_submission(&form, Some("http://x/doc.pdf"))?;
        let all = db.list_contact_submissions()?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, saved.id);
        assert_eq!(all[0].document_url.as_deref(), Some("http://x/doc.pdf"));
        assert_eq!(all[0].phone_number.as_deref(), Some("9876543210"));
        Ok(())
    }

    #[test]
    fn test_gallery_crud() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let image = db.insert_gallery_image("Office", "a.png", "http://x/gallery/a.png", 2)?;
        db.insert_gallery_image("Lobby", "b.png", "http://x/gallery/b.png", 1)?;
        let titles: Vec<String> = db.list_gallery_images()?.into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["Lobby", "Office"]);
        assert_eq!(db.max_gallery_order()?, 2);

        let renamed = db.update_gallery_title(&image.id, "Front desk")?.unwrap();
        assert_eq!(renamed.title, "Front desk");
        assert!(db.update_gallery_title("missing", "x")?.is_none());

        assert!(db.delete_gallery_image(&image.id)?);
        assert!(!db.delete_gallery_image(&image.id)?);
        assert!(db.get_gallery_image(&image.id)?.is_none());
        Ok(())
    }

    #[test]
    fn test_litigation_cases() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        db.insert_litigation_case(&NewLitigationCase {
            case_no: Some("OA/12/2024".into()),
            status: Some("Decreed".into()),
            created_at: Some(DateTime::parse_from_rfc3339("2024-02-01T00:00:00Z").unwrap()),
            ..Default::default()
        })?;
        db.insert_litigation_case(&NewLitigationCase::default())?;
        let cases = db.list_litigation_cases()?;
        assert_eq!(cases.len(), 2);
        // newest first: the default one was created now
        assert_eq!(cases[0].status, None);
        assert_eq!(cases[1].case_no.as_deref(), Some("OA/12/2024"));
        Ok(())
    }

    #[tokio::test]
    async fn test_db_handle_call() -> Result<()> {
        let handle = DbHandle::new(CaseDb::new_in_memory()?);
        handle
            .call(|db| db.insert_case(&new_case("LO-9", "draft", "2024-01-01T00:00:00Z")))
            .await?;
        let count = handle.call(|db| db.count_cases()).await?;
        assert_eq!(count, 1);
        assert_eq!(handle.lock_sync()?.count_cases()?, 1);
        Ok(())
    }

    #[test]
    fn test_catalog_crud_keeps_kinds_apart() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        let home = db.insert_catalog_entry(CatalogKind::LoanType, "Home Loan")?;
        db.insert_catalog_entry(CatalogKind::LoanType, "Mortgage")?;
        db.insert_catalog_entry(CatalogKind::ApplicationType, "Legal Opinion")?;

        let loans: Vec<String> = db
            .list_catalog_entries(CatalogKind::LoanType)?
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(loans, vec!["Mortgage", "Home Loan"]);
        assert_eq!(db.list_catalog_entries(CatalogKind::ApplicationType)?.len(), 1);

        let renamed = db
            .rename_catalog_entry(CatalogKind::LoanType, &home.id, "Housing Loan")?
            .unwrap();
        assert_eq!(renamed.name, "Housing Loan");
        assert_eq!(renamed.created_at, home.created_at);
        // an id from the other table is unknown here
        assert!(
            db.rename_catalog_entry(CatalogKind::ApplicationType, &home.id, "x")?
                .is_none()
        );

        assert!(db.delete_catalog_entry(CatalogKind::LoanType, &home.id)?);
        assert!(!db.delete_catalog_entry(CatalogKind::LoanType, &home.id)?);
        assert!(db.get_catalog_entry(CatalogKind::LoanType, &home.id)?.is_none());
        Ok(())
    }

    #[test]
    fn test_bank_counters_upsert_and_sort() -> Result<()> {
        let db = CaseDb::new_in_memory()?;
        db.set_bank_counter("State Bank of India", 12)?;
        db.set_bank_counter("HDFC Bank", 4)?;
        db.set_bank_counter("State Bank of India", 15)?;
        let counters = db.list_bank_counters()?;
        assert_eq!(
            counters,
            vec![
                BankCounter {
                    bank_name: "HDFC Bank".into(),
                    last_sequence: 4
                },
                BankCounter {
                    bank_name: "State Bank of India".into(),
                    last_sequence: 15
                },
            ]
        );
        Ok(())
    }
}
