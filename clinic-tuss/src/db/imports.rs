//! `data_imports` ledger operations
//!
//! A ledger row is inserted in `processing` state and receives exactly one
//! terminal update. The terminal updates only match rows still in
//! `processing`, so a second completion/failure for the same run is refused.

use clinic_common::db::{format_timestamp, DataImport, DataImportRow, ImportStatus};
use clinic_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

const SELECT_IMPORT: &str = "SELECT id, import_type, version, records_count, status, \
     error_message, imported_at, imported_by FROM data_imports";

pub async fn insert_import(pool: &SqlitePool, import: &DataImport) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO data_imports (
            id, import_type, version, records_count, status,
            error_message, imported_at, imported_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(import.id.to_string())
    .bind(&import.import_type)
    .bind(&import.version)
    .bind(import.records_count)
    .bind(import.status.as_str())
    .bind(&import.error_message)
    .bind(format_timestamp(&import.imported_at))
    .bind(&import.imported_by)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_completed(
    pool: &SqlitePool,
    id: Uuid,
    records_count: i64,
    version: &str,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE data_imports SET status = ?, records_count = ?, version = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(ImportStatus::Completed.as_str())
    .bind(records_count)
    .bind(version)
    .bind(id.to_string())
    .bind(ImportStatus::Processing.as_str())
    .execute(pool)
    .await?;

    ensure_one_row(result.rows_affected(), id)
}

pub async fn mark_failed(pool: &SqlitePool, id: Uuid, error_message: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE data_imports SET status = ?, error_message = ? WHERE id = ? AND status = ?",
    )
    .bind(ImportStatus::Failed.as_str())
    .bind(error_message)
    .bind(id.to_string())
    .bind(ImportStatus::Processing.as_str())
    .execute(pool)
    .await?;

    ensure_one_row(result.rows_affected(), id)
}

fn ensure_one_row(rows_affected: u64, id: Uuid) -> Result<()> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(Error::NotFound(format!("No import {} in processing state", id)))
    }
}

pub async fn get_import(pool: &SqlitePool, id: Uuid) -> Result<Option<DataImport>> {
    let sql = format!("{} WHERE id = ?", SELECT_IMPORT);
    let row = sqlx::query_as::<_, DataImportRow>(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.map(DataImport::try_from).transpose()
}

/// Most recent `completed` run of `import_type`
pub async fn last_completed(pool: &SqlitePool, import_type: &str) -> Result<Option<DataImport>> {
    let sql = format!(
        "{} WHERE import_type = ? AND status = ? ORDER BY imported_at DESC LIMIT 1",
        SELECT_IMPORT
    );
    let row = sqlx::query_as::<_, DataImportRow>(&sql)
        .bind(import_type)
        .bind(ImportStatus::Completed.as_str())
        .fetch_optional(pool)
        .await?;
    row.map(DataImport::try_from).transpose()
}

/// Newest-first history of `import_type` runs
pub async fn list_recent(
    pool: &SqlitePool,
    import_type: &str,
    limit: i64,
) -> Result<Vec<DataImport>> {
    let sql = format!(
        "{} WHERE import_type = ? ORDER BY imported_at DESC LIMIT ?",
        SELECT_IMPORT
    );
    let rows = sqlx::query_as::<_, DataImportRow>(&sql)
        .bind(import_type)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(DataImport::try_from).collect()
}
