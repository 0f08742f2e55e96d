//! clinic-tuss library interface
//!
//! TUSS reference-data import service: HTTP API, import pipeline and the
//! database access it runs against. Exposed as a library for integration
//! testing.

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::TussImporter;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Service name used for the config file and health reports
pub const MODULE_NAME: &str = "clinic-tuss";

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 5000;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub importer: Arc<TussImporter>,
    /// Held for the duration of an import; one run per process
    pub import_guard: Arc<Mutex<()>>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, importer: TussImporter) -> Self {
        Self {
            db,
            importer: Arc::new(importer),
            import_guard: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::tuss_routes())
        .merge(api::code_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
