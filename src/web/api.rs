use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::backend::{CaseBackend, CaseQuery, LocalBackend};
use crate::cases::analytics::{
    self, BankCount, BankOverview, LegalOpinionStats, LitigationMonth, MonthlyStatusCounts,
    Period,
};
use crate::cases::filter::{self, FilterCriteria, selected};
use crate::cases::models::{CaseRecord, CaseStatus, DisplayRecord, Session};
use crate::cases::projector::project;
use crate::errors::{BackendError, OfficeError};
use crate::office::contact::{self, MAX_ATTACHMENT_BYTES, SubmissionFilter};
use crate::office::litigation::{self, LitigationFilter, LitigationListing};
use crate::office::models::{
    Attachment, BankAccount, BankCounter, CatalogEntry, CatalogKind, ContactForm,
    ContactSubmission, EmployeeAccount, GalleryImage,
};
use crate::office::{catalog, gallery};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub backend: Arc<LocalBackend>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

/// Query string of `GET /api/cases`: the viewer (`user`, `admin`) plus the
/// list filter criteria.
#[derive(Debug, Default, Deserialize)]
pub struct CaseListParams {
    pub user: Option<String>,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub search: String,
    pub bank: Option<String>,
    pub branch: Option<String>,
    pub status: Option<String>,
    pub application_type: Option<String>,
    pub employee: Option<String>,
    pub office_branch: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CaseListParams {
    fn session(&self) -> Session {
        Session {
            employee: self.user.clone().filter(|u| !u.is_empty()),
            admin_scope: self.admin,
        }
    }

    fn criteria(self) -> FilterCriteria {
        FilterCriteria {
            search: self.search,
            bank: self.bank,
            branch: self.branch,
            status: self.status,
            application_type: self.application_type,
            employee: self.employee,
            office_branch: self.office_branch,
            start_date: self.start_date,
            end_date: self.end_date,
            admin_scope: self.admin,
        }
        .normalized()
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct RenameImageRequest {
    pub title: String,
}

/// Body of the loan-type and application-type create and rename calls.
#[derive(Deserialize)]
pub struct CatalogNameRequest {
    pub name: String,
}

/// `bank` is a bank account username, or `"all"`.
#[derive(Debug, Default, Deserialize)]
pub struct BankOverviewParams {
    pub bank: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl PeriodParams {
    fn period(&self) -> Period {
        Period {
            year: self.year.unwrap_or_else(|| Local::now().year()),
            month: self.month,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TopBanksParams {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct LegalOpinionReport {
    pub period: Period,
    pub stats: LegalOpinionStats,
    pub monthly: Vec<MonthlyStatusCounts>,
}

#[derive(Serialize)]
pub struct LitigationReport {
    pub period: Period,
    pub monthly: Vec<LitigationMonth>,
}

const DEFAULT_TOP_BANKS: usize = 5;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match &err {
            BackendError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            BackendError::InvalidPath(_) | BackendError::BadRequest(_) => {
                ApiError::BadRequest(err.to_string())
            }
            BackendError::Storage { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ApiError::NotFound(err.to_string())
            }
            _ => {
                error!(error = %err, "Request failed");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<OfficeError> for ApiError {
    fn from(err: OfficeError) -> Self {
        match err {
            OfficeError::Backend(inner) => inner.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    BackendError::Database(err).into()
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/cases", get(list_cases))
        .route("/api/cases/{id}/status", patch(update_case_status))
        .route("/api/employees", get(list_employees))
        .route("/api/bank-accounts", get(list_bank_accounts))
        .route("/api/analytics/legal-opinion", get(legal_opinion_report))
        .route("/api/analytics/litigation", get(litigation_report))
        .route("/api/analytics/top-banks", get(top_banks))
        .route("/api/analytics/bank-overview", get(bank_overview))
        .route("/api/bank-counters", get(list_bank_counters))
        .route("/api/litigation-cases", get(list_litigation_cases))
        .route("/api/contact", post(submit_contact))
        .route("/api/contact-submissions", get(list_contact_submissions))
        .route("/api/gallery", get(list_gallery).post(upload_gallery_image))
        .route("/api/gallery/sync", post(sync_gallery))
        .route(
            "/api/gallery/{id}",
            patch(rename_gallery_image).delete(delete_gallery_image),
        )
        .route("/storage/{bucket}/{*path}", get(serve_object))
        .merge(catalog_router("/api/loan-types", CatalogKind::LoanType))
        .merge(catalog_router("/api/application-types", CatalogKind::ApplicationType))
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 1024 * 1024))
}

/// List, create, rename and delete routes for one admin name list.
fn catalog_router(base: &str, kind: CatalogKind) -> Router<SharedState> {
    Router::new()
        .route(
            base,
            get(move |state: State<SharedState>| list_catalog(state, kind)).post(
                move |state: State<SharedState>, body: Json<CatalogNameRequest>| {
                    create_catalog_entry(state, kind, body)
                },
            ),
        )
        .route(
            &format!("{base}/{{id}}"),
            patch(
                move |state: State<SharedState>,
                      id: Path<String>,
                      body: Json<CatalogNameRequest>| {
                    rename_catalog_entry(state, kind, id, body)
                },
            )
            .delete(move |state: State<SharedState>, id: Path<String>| {
                delete_catalog_entry(state, kind, id)
            }),
        )
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Text fields and files of a multipart form, keyed by field name. Only
/// the first non-empty file of each field is kept.
struct FormParts {
    fields: HashMap<String, String>,
    files: HashMap<String, Attachment>,
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormParts, ApiError> {
    let mut parts = FormParts {
        fields: HashMap::new(),
        files: HashMap::new(),
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                if !bytes.is_empty() {
                    parts.files.entry(name).or_insert_with(|| Attachment {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                parts.fields.insert(name, text);
            }
        }
    }
    Ok(parts)
}

impl FormParts {
    fn take_file(&mut self, field: &str) -> Option<Attachment> {
        self.files.remove(field)
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_cases(
    State(state): State<SharedState>,
    Query(params): Query<CaseListParams>,
) -> Result<Json<Vec<DisplayRecord>>, ApiError> {
    let session = params.session();
    let cases = state
        .backend
        .fetch_cases(CaseQuery::for_session(&session))
        .await?;
    let records: Vec<DisplayRecord> = cases.into_iter().map(|c| project(c, &session)).collect();
    Ok(Json(filter::filter(&records, &params.criteria())))
}

async fn update_case_status(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<CaseRecord>, ApiError> {
    let status = CaseStatus::from_str(&req.status).map_err(ApiError::BadRequest)?;
    let updated = state
        .backend
        .update_case_status(&id, status.as_str())
        .await?;
    Ok(Json(updated))
}

async fn list_employees(
    State(state): State<SharedState>,
) -> Result<Json<Vec<EmployeeAccount>>, ApiError> {
    let employees = state
        .backend
        .db()
        .call(|db| db.list_active_employees())
        .await
        .map_err(internal)?;
    Ok(Json(employees))
}

async fn list_bank_accounts(
    State(state): State<SharedState>,
) -> Result<Json<Vec<BankAccount>>, ApiError> {
    let banks = state
        .backend
        .db()
        .call(|db| db.list_active_bank_accounts())
        .await
        .map_err(internal)?;
    Ok(Json(banks))
}

async fn legal_opinion_report(
    State(state): State<SharedState>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<LegalOpinionReport>, ApiError> {
    let period = params.period();
    let cases = state.backend.fetch_cases(CaseQuery::all()).await?;
    let now = Local::now();
    Ok(Json(LegalOpinionReport {
        period,
        stats: analytics::legal_opinion_stats(&cases, period, &now),
        monthly: analytics::legal_opinion_monthly(&cases, period, &Local),
    }))
}

async fn litigation_report(
    State(state): State<SharedState>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<LitigationReport>, ApiError> {
    let period = params.period();
    let cases = state
        .backend
        .db()
        .call(|db| db.list_litigation_cases())
        .await
        .map_err(internal)?;
    Ok(Json(LitigationReport {
        period,
        monthly: analytics::litigation_monthly(&cases, period, &Local),
    }))
}

async fn top_banks(
    State(state): State<SharedState>,
    Query(params): Query<TopBanksParams>,
) -> Result<Json<Vec<BankCount>>, ApiError> {
    let cases = state.backend.fetch_cases(CaseQuery::all()).await?;
    let limit = params.limit.unwrap_or(DEFAULT_TOP_BANKS);
    Ok(Json(analytics::top_banks_this_month(
        &cases,
        &Local::now(),
        limit,
    )))
}

async fn bank_overview(
    State(state): State<SharedState>,
    Query(params): Query<BankOverviewParams>,
) -> Result<Json<BankOverview>, ApiError> {
    let cases = state.backend.fetch_cases(CaseQuery::all()).await?;
    let (counters, accounts) = state
        .backend
        .db()
        .call(|db| Ok((db.list_bank_counters()?, db.list_active_bank_accounts()?)))
        .await
        .map_err(internal)?;
    let overview = match selected(&params.bank) {
        None => analytics::bank_overview(&cases, &counters, None),
        Some(username) => match accounts.iter().find(|a| a.username == username) {
            Some(account) => analytics::bank_overview(&cases, &counters, Some(account)),
            None => BankOverview::default(),
        },
    };
    Ok(Json(overview))
}

async fn list_bank_counters(
    State(state): State<SharedState>,
) -> Result<Json<Vec<BankCounter>>, ApiError> {
    let counters = state
        .backend
        .db()
        .call(|db| db.list_bank_counters())
        .await
        .map_err(internal)?;
    Ok(Json(counters))
}

async fn list_litigation_cases(
    State(state): State<SharedState>,
    Query(filter): Query<LitigationFilter>,
) -> Result<Json<LitigationListing>, ApiError> {
    Ok(Json(litigation::list_cases(&state.backend, filter).await?))
}

async fn list_catalog(
    State(state): State<SharedState>,
    kind: CatalogKind,
) -> Result<Json<Vec<CatalogEntry>>, ApiError> {
    Ok(Json(catalog::list_entries(&state.backend, kind).await?))
}

async fn create_catalog_entry(
    State(state): State<SharedState>,
    kind: CatalogKind,
    Json(req): Json<CatalogNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = catalog::create_entry(&state.backend, kind, &req.name).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn rename_catalog_entry(
    State(state): State<SharedState>,
    kind: CatalogKind,
    Path(id): Path<String>,
    Json(req): Json<CatalogNameRequest>,
) -> Result<Json<CatalogEntry>, ApiError> {
    Ok(Json(
        catalog::rename_entry(&state.backend, kind, &id, &req.name).await?,
    ))
}

async fn delete_catalog_entry(
    State(state): State<SharedState>,
    kind: CatalogKind,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_entry(&state.backend, kind, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_contact(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut parts = read_multipart(multipart).await?;
    let document = parts.take_file("document");
    let form = ContactForm {
        name: parts.fields.remove("name").unwrap_or_default(),
        email: parts.fields.remove("email").unwrap_or_default(),
        phone_number: parts.fields.remove("phone_number"),
        message: parts.fields.remove("message"),
    };
    let saved = contact::submit_contact(&state.backend, form, document).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn list_contact_submissions(
    State(state): State<SharedState>,
    Query(filter): Query<SubmissionFilter>,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    let submissions = state
        .backend
        .db()
        .call(|db| db.list_contact_submissions())
        .await
        .map_err(internal)?;
    Ok(Json(contact::filter_submissions(
        &submissions,
        &filter,
        &Local,
    )))
}

async fn list_gallery(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GalleryImage>>, ApiError> {
    Ok(Json(gallery::list_images(&state.backend).await?))
}

async fn upload_gallery_image(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut parts = read_multipart(multipart).await?;
    let file = parts
        .take_file("file")
        .ok_or_else(|| ApiError::BadRequest("Missing image file".into()))?;
    let display_order = parts
        .fields
        .get("display_order")
        .map(|v| v.trim().parse::<i64>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("Invalid display_order: {}", e)))?;
    let mut image = gallery::upload_image(&state.backend, file, display_order).await?;
    if let Some(title) = parts.fields.get("title").filter(|t| !t.trim().is_empty()) {
        image = gallery::rename_image(&state.backend, &image.id, title).await?;
    }
    Ok((StatusCode::CREATED, Json(image)))
}

async fn sync_gallery(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GalleryImage>>, ApiError> {
    Ok(Json(gallery::sync_from_storage(&state.backend).await?))
}

async fn rename_gallery_image(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<RenameImageRequest>,
) -> Result<Json<GalleryImage>, ApiError> {
    Ok(Json(
        gallery::rename_image(&state.backend, &id, &req.title).await?,
    ))
}

async fn delete_gallery_image(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    gallery::delete_image(&state.backend, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn serve_object(
    State(state): State<SharedState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.backend.storage().download(&bucket, &path).await?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        bytes,
    ))
}
