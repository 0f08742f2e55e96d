//! Shared helpers for clinic-tuss integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use std::io::Write;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

use clinic_tuss::services::{ImporterConfig, TussImporter};
use clinic_tuss::AppState;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub state: AppState,
    pub work_dir: std::path::PathBuf,
    _root: TempDir,
}

/// App over a fresh on-disk database, importing from `source_url`
pub async fn create_test_app(source_url: &str) -> TestApp {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = clinic_common::db::init_database(&root.path().join("clinic.db"))
        .await
        .expect("Failed to initialize database");
    let work_dir = root.path().join("tmp");

    let importer = TussImporter::new(
        ImporterConfig::new(&work_dir)
            .with_source_url(source_url)
            .with_download_timeout(Duration::from_secs(10)),
    )
    .expect("Failed to build importer");

    let state = AppState::new(pool.clone(), importer);
    let app = clinic_tuss::build_router(state.clone());

    TestApp {
        app,
        pool,
        state,
        work_dir,
        _root: root,
    }
}

/// In-memory ZIP archive with the given entries
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Serve `body` with `status` at `/TUSS.zip` on an ephemeral port
pub async fn serve_archive(status: StatusCode, body: Vec<u8>) -> String {
    let router = Router::new().route("/TUSS.zip", get(move || async move { (status, body) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/TUSS.zip", addr)
}

/// Like `serve_archive`, answering 200 only after `delay`
pub async fn serve_slow_archive(delay: Duration, body: Vec<u8>) -> String {
    let router = Router::new().route(
        "/TUSS.zip",
        get(move || async move {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, body)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/TUSS.zip", addr)
}

/// Archive with one importable table and one outside the allow-list
pub fn sample_archive() -> Vec<u8> {
    zip_bytes(&[
        (
            "Tabela_22_Teste.csv",
            b"Codigo;Descricao\n10101012;Consulta medica\n,,\n",
        ),
        ("Tabela_99_Outros.csv", b"Codigo;Descricao\n99999999;Ignorado\n"),
    ])
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
