//! Code search and import history
//!
//! GET /api/tuss-codes, GET /api/tuss-imports, GET /api/tuss-imports/:id

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use clinic_common::db::{DataImport, TussCode, TUSS_IMPORT_KIND};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{codes, imports, CodeSearch};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub search: Option<String>,
    pub table: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePage {
    pub total_results: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub codes: Vec<TussCode>,
}

/// GET /api/tuss-codes?search=&table=&page=
pub async fn search_codes(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> ApiResult<Json<CodePage>> {
    let filter = CodeSearch {
        text: query.search,
        table_number: query.table,
    };

    let total_results = codes::count_matching(&state.db, &filter).await?;
    let pagination = calculate_pagination(total_results, query.page.unwrap_or(1));
    let codes = codes::search(&state.db, &filter, PAGE_SIZE, pagination.offset).await?;

    Ok(Json(CodePage {
        total_results,
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        codes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/tuss-imports?limit=
pub async fn list_imports(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<DataImport>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }

    let history = imports::list_recent(&state.db, TUSS_IMPORT_KIND, limit).await?;
    Ok(Json(history))
}

/// GET /api/tuss-imports/:id
pub async fn get_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataImport>> {
    imports::get_import(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Import not found: {}", id)))
}

pub fn code_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tuss-codes", get(search_codes))
        .route("/api/tuss-imports", get(list_imports))
        .route("/api/tuss-imports/:id", get(get_import))
}
