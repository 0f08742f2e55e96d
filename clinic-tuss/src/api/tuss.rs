//! TUSS import trigger and statistics
//!
//! POST /api/tuss-import, GET /api/tuss-statistics

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::SqliteTussStore;
use crate::error::{ApiError, ApiResult};
use crate::services::{collect_statistics, ImportOutcome, TussStatistics};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(default)]
    pub imported_by: String,
}

/// POST /api/tuss-import
///
/// The import runs on its own task holding the import guard, so a client
/// that disconnects does not cancel it. 200 with the outcome on success,
/// 500 with the same body shape on failure, 409 while another run is active.
pub async fn start_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<(StatusCode, Json<ImportOutcome>)> {
    let imported_by = request.imported_by.trim().to_string();
    if imported_by.is_empty() {
        return Err(ApiError::BadRequest("importedBy is required".to_string()));
    }

    let guard = state.import_guard.clone().try_lock_owned().map_err(|_| {
        tracing::warn!(imported_by = %imported_by, "Import requested while another is running");
        ApiError::Conflict("A TUSS import is already running".to_string())
    })?;

    let importer = state.importer.clone();
    let store = SqliteTussStore::new(state.db.clone());
    let handle = tokio::spawn(async move {
        let _guard = guard;
        importer.import(&store, &imported_by).await
    });

    let outcome = handle
        .await
        .map_err(|e| ApiError::Internal(format!("Import task failed: {}", e)))?;

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(outcome)))
}

/// GET /api/tuss-statistics
pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<TussStatistics>> {
    let store = SqliteTussStore::new(state.db.clone());
    let stats = collect_statistics(&store).await?;
    Ok(Json(stats))
}

pub fn tuss_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tuss-import", post(start_import))
        .route("/api/tuss-statistics", get(get_statistics))
}
