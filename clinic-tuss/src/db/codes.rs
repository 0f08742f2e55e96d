//! `tuss_codes` table operations

use chrono::Utc;
use clinic_common::db::{format_timestamp, TussCode};
use clinic_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Row count for one (table number, table name) pair
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TableCount {
    pub table_number: String,
    pub table_name: String,
    pub count: i64,
}

/// Filter for code lookups
#[derive(Debug, Clone, Default)]
pub struct CodeSearch {
    /// Matches a code prefix or a description substring (case-insensitive for ASCII)
    pub text: Option<String>,
    /// Restrict to one TUSS table number
    pub table_number: Option<String>,
}

/// Insert one batch with INSERT OR IGNORE keyed on `code`
///
/// The batch is a single multi-row statement in its own transaction.
/// Returns the number of rows actually created; duplicates are not counted.
pub async fn insert_batch(pool: &SqlitePool, batch: &[TussCode]) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let created_at = format_timestamp(&Utc::now());
    let mut tx = pool.begin().await?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT OR IGNORE INTO tuss_codes \
         (code, description, table_number, table_name, category, subcategory, is_active, created_at) ",
    );
    builder.push_values(batch, |mut row, code| {
        row.push_bind(code.code.clone())
            .push_bind(code.description.clone())
            .push_bind(code.table_number.clone())
            .push_bind(code.table_name.clone())
            .push_bind(code.category.clone())
            .push_bind(code.subcategory.clone())
            .push_bind(code.is_active)
            .push_bind(created_at.clone());
    });

    let result = builder.build().execute(&mut *tx).await?;
    tx.commit().await?;

    Ok(result.rows_affected())
}

pub async fn count_codes(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tuss_codes")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Per-table row counts, ordered numerically by table number
pub async fn count_by_table(pool: &SqlitePool) -> Result<Vec<TableCount>> {
    let counts = sqlx::query_as::<_, TableCount>(
        r#"
        SELECT table_number, table_name, COUNT(*) AS count
        FROM tuss_codes
        GROUP BY table_number, table_name
        ORDER BY CAST(table_number AS INTEGER), table_name
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(counts)
}

/// Escape LIKE wildcards so user text matches literally (ESCAPE '\')
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn search_terms(search: &CodeSearch) -> (Option<String>, Option<String>, Option<String>) {
    let text = search
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(escape_like);
    let prefix = text.as_ref().map(|t| format!("{}%", t));
    let contains = text.map(|t| format!("%{}%", t));
    let table = search
        .table_number
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    (prefix, contains, table)
}

const SEARCH_WHERE: &str = r#"
    WHERE (?1 IS NULL OR code LIKE ?1 ESCAPE '\' OR description LIKE ?2 ESCAPE '\')
      AND (?3 IS NULL OR table_number = ?3)
"#;

pub async fn count_matching(pool: &SqlitePool, search: &CodeSearch) -> Result<i64> {
    let (prefix, contains, table) = search_terms(search);
    let sql = format!("SELECT COUNT(*) FROM tuss_codes {}", SEARCH_WHERE);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(prefix)
        .bind(contains)
        .bind(table)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// One page of matching codes ordered by table then code
pub async fn search(
    pool: &SqlitePool,
    search: &CodeSearch,
    limit: i64,
    offset: i64,
) -> Result<Vec<TussCode>> {
    let (prefix, contains, table) = search_terms(search);
    let sql = format!(
        "SELECT code, description, table_number, table_name, category, subcategory, is_active \
         FROM tuss_codes {} \
         ORDER BY CAST(table_number AS INTEGER), code \
         LIMIT ?4 OFFSET ?5",
        SEARCH_WHERE
    );
    let codes = sqlx::query_as::<_, TussCode>(&sql)
        .bind(prefix)
        .bind(contains)
        .bind(table)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(codes)
}
