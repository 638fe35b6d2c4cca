use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use super::api::{self, AppState, SharedState};
use super::ws;
use crate::backend::db::{CaseDb, DbHandle};
use crate::backend::{ChangeFeed, LocalBackend, ObjectStore};
use crate::config::AppConfig;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub dev_mode: bool,
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl ServerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            db_path: config.database.path.clone(),
            storage_root: config.storage_root(),
            public_base_url: config.public_base_url(),
            dev_mode: config.server.dev,
            channel_capacity: config.sync.channel_capacity.max(1),
        }
    }
}

/// Build the full application router: REST API plus the live list socket.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .route("/ws/cases", get(ws::ws_handler))
        .with_state(state)
}

/// Open the database and storage named by `config`.
pub fn open_backend(config: &ServerConfig) -> Result<LocalBackend> {
    if let Some(parent) = config.db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    std::fs::create_dir_all(&config.storage_root).with_context(|| {
        format!(
            "Failed to create storage root {}",
            config.storage_root.display()
        )
    })?;

    let db = CaseDb::new(&config.db_path).context("Failed to initialize case database")?;
    Ok(LocalBackend::new(
        DbHandle::new(db),
        ObjectStore::new(&config.storage_root, config.public_base_url.clone()),
        ChangeFeed::new(config.channel_capacity),
    ))
}

/// Start the server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let backend = open_backend(&config)?;
    let state = Arc::new(AppState {
        backend: Arc::new(backend),
    });

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        addr = %local_addr,
        db = %config.db_path.display(),
        dev = config.dev_mode,
        "casedesk listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_config(dir: &tempfile::TempDir) -> ServerConfig {
        ServerConfig {
            db_path: dir.path().join("db").join("casedesk.db"),
            storage_root: dir.path().join("objects"),
            ..ServerConfig::default()
        }
    }

    fn test_router(config: &ServerConfig) -> Router {
        let backend = open_backend(config).unwrap();
        build_router(Arc::new(AppState {
            backend: Arc::new(backend),
        }))
    }

    #[test]
    fn test_server_config_from_app_config() {
        let mut app = AppConfig::default();
        app.server.port = 8080;
        app.sync.channel_capacity = 0;
        let config = ServerConfig::from_app_config(&app);
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_base_url, "http://127.0.0.1:8080/storage");
        assert_eq!(config.channel_capacity, 1);
    }

    #[test]
    fn test_open_backend_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        open_backend(&config).unwrap();
        assert!(config.db_path.exists());
        assert!(config.storage_root.is_dir());
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&test_config(&dir));
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&test_config(&dir));
        let req = Request::builder()
            .uri("/api/cases?admin=true")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&test_config(&dir));
        let req = Request::builder()
            .uri("/ws/cases")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&test_config(&dir));
        let req = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
