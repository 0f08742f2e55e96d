//! Database initialization
//!
//! Opens (or creates) the SQLite database in the root folder and brings the
//! TUSS schema up to date. Every statement is idempotent, so this runs on
//! every start-up.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open the database at `db_path`, creating file, directory and tables as needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets the statistics endpoint read while an import is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create the TUSS tables and indexes if they don't exist
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_tuss_codes_table(pool).await?;
    create_data_imports_table(pool).await?;
    Ok(())
}

async fn create_tuss_codes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tuss_codes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            table_number TEXT NOT NULL,
            table_name TEXT NOT NULL,
            category TEXT,
            subcategory TEXT,
            is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tuss_codes_table ON tuss_codes(table_number)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_data_imports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_imports (
            id TEXT PRIMARY KEY,
            import_type TEXT NOT NULL,
            version TEXT,
            records_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL CHECK (status IN ('processing', 'completed', 'failed')),
            error_message TEXT,
            imported_at TEXT NOT NULL,
            imported_by TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_data_imports_type_time ON data_imports(import_type, imported_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
