//! Integration tests for the clinic-tuss HTTP API
//!
//! A local axum server stands in for the ANS download host.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;

use helpers::{
    create_test_app, get_json, post_json, sample_archive, serve_archive, serve_slow_archive,
    zip_bytes,
};

async fn ledger_rows(pool: &sqlx::SqlitePool) -> Vec<(String, i64, Option<String>, Option<String>)> {
    sqlx::query_as(
        "SELECT status, records_count, error_message, version FROM data_imports ORDER BY imported_at",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let t = create_test_app("http://127.0.0.1:9/TUSS.zip").await;

    let (status, body) = get_json(&t.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "clinic-tuss");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["gitHash"].is_string());
    assert!(body["uptimeSeconds"].is_u64());
}

#[tokio::test]
async fn test_import_end_to_end() {
    let url = serve_archive(StatusCode::OK, sample_archive()).await;
    let t = create_test_app(&url).await;

    let (status, body) = post_json(&t.app, "/api/tuss-import", json!({"importedBy": "admin"})).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["recordsImported"], 1);

    let (status, stats) = get_json(&t.app, "/api/tuss-statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalCodes"], 1);
    assert_eq!(
        stats["codesByTable"],
        json!([{"table": "22 - Procedimentos", "count": 1}])
    );
    assert!(stats["lastImport"].is_string());

    let rows = ledger_rows(&t.pool).await;
    assert_eq!(rows.len(), 1);
    let (status, count, error, version) = &rows[0];
    assert_eq!(status, "completed");
    assert_eq!(*count, 1);
    assert!(error.is_none());
    assert_eq!(version.as_deref().map(str::len), Some(10));

    // Per-run directory removed
    let leftovers = std::fs::read_dir(&t.work_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let url = serve_archive(StatusCode::OK, sample_archive()).await;
    let t = create_test_app(&url).await;

    for _ in 0..2 {
        let (status, body) =
            post_json(&t.app, "/api/tuss-import", json!({"importedBy": "admin"})).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let (_, stats) = get_json(&t.app, "/api/tuss-statistics").await;
    assert_eq!(stats["totalCodes"], 1);

    let rows = ledger_rows(&t.pool).await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|(status, ..)| status == "completed"));
}

#[tokio::test]
async fn test_download_404_reports_failure() {
    let url = serve_archive(StatusCode::NOT_FOUND, Vec::new()).await;
    let t = create_test_app(&url).await;

    let (status, body) = post_json(&t.app, "/api/tuss-import", json!({"importedBy": "admin"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("404"));
    assert!(body.get("recordsImported").is_none());

    let rows = ledger_rows(&t.pool).await;
    assert_eq!(rows.len(), 1);
    let (status, count, error, _) = &rows[0];
    assert_eq!(status, "failed");
    assert_eq!(*count, 0);
    assert!(error.as_deref().unwrap().contains("404"));

    let (_, stats) = get_json(&t.app, "/api/tuss-statistics").await;
    assert_eq!(stats["totalCodes"], 0);
    assert!(stats.get("lastImport").is_none());
}

#[tokio::test]
async fn test_abandoned_request_still_finishes_import() {
    let url = serve_slow_archive(Duration::from_secs(2), sample_archive()).await;
    let t = create_test_app(&url).await;

    // Client gives up while the archive is still downloading
    let abandoned = tokio::time::timeout(
        Duration::from_millis(300),
        post_json(&t.app, "/api/tuss-import", json!({"importedBy": "admin"})),
    )
    .await;
    assert!(abandoned.is_err());

    let mut finished = false;
    for _ in 0..100 {
        let rows = ledger_rows(&t.pool).await;
        let settled = rows.iter().all(|(status, ..)| status != "processing");
        if !rows.is_empty() && settled && t.state.import_guard.try_lock().is_ok() {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(finished, "import did not finish after the client went away");

    let rows = ledger_rows(&t.pool).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "completed");
    assert_eq!(rows[0].1, 1);

    let (_, stats) = get_json(&t.app, "/api/tuss-statistics").await;
    assert_eq!(stats["totalCodes"], 1);

    let leftovers = std::fs::read_dir(&t.work_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_blank_imported_by_is_rejected() {
    let t = create_test_app("http://127.0.0.1:9/TUSS.zip").await;

    let (status, body) = post_json(&t.app, "/api/tuss-import", json!({"importedBy": "  "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(ledger_rows(&t.pool).await.is_empty());
}

#[tokio::test]
async fn test_import_while_running_is_conflict() {
    let t = create_test_app("http://127.0.0.1:9/TUSS.zip").await;
    let _running = t.state.import_guard.lock().await;

    let (status, body) = post_json(&t.app, "/api/tuss-import", json!({"importedBy": "admin"})).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert!(ledger_rows(&t.pool).await.is_empty());
}

#[tokio::test]
async fn test_code_search_and_history() {
    let archive = zip_bytes(&[
        (
            "Tabela_22_Procedimentos.csv",
            b"Codigo;Descricao\n10101012;Consulta em consultorio\n40301010;Hemograma completo\n",
        ),
        (
            "Tabela 50 Via.csv",
            b"CODIGO;DESCRICAO\n1;Oral\n2;Intravenosa\n",
        ),
    ]);
    let url = serve_archive(StatusCode::OK, archive).await;
    let t = create_test_app(&url).await;
    let (status, _) = post_json(&t.app, "/api/tuss-import", json!({"importedBy": "admin"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = get_json(&t.app, "/api/tuss-codes?search=hemo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalResults"], 1);
    assert_eq!(page["codes"][0]["code"], "40301010");
    assert_eq!(page["codes"][0]["tableName"], "Procedimentos");

    let (_, page) = get_json(&t.app, "/api/tuss-codes?table=50").await;
    assert_eq!(page["totalResults"], 2);
    assert_eq!(page["pageSize"], 50);
    assert_eq!(page["page"], 1);
    assert_eq!(page["totalPages"], 1);

    let (_, page) = get_json(&t.app, "/api/tuss-codes?search=1").await;
    assert_eq!(page["totalResults"], 2);

    let (status, history) = get_json(&t.app, "/api/tuss-imports").await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "completed");
    assert_eq!(history[0]["recordsCount"], 4);
    assert_eq!(history[0]["importedBy"], "admin");

    let id = history[0]["id"].as_str().unwrap();
    let (status, one) = get_json(&t.app, &format!("/api/tuss-imports/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["id"], id);
}

#[tokio::test]
async fn test_history_limit_and_unknown_import() {
    let t = create_test_app("http://127.0.0.1:9/TUSS.zip").await;

    let (status, _) = get_json(&t.app, "/api/tuss-imports?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get_json(&t.app, "/api/tuss-imports?limit=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(
        &t.app,
        "/api/tuss-imports/6f1c1d8e-2a4b-4c3d-9e5f-0a1b2c3d4e5f",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
