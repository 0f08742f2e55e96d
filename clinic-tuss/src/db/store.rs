//! Persistence service used by the import pipeline
//!
//! The importer and statistics reporter receive a `&dyn TussStore` at call
//! time instead of reaching for a global pool, so tests can substitute
//! their own implementation.

use async_trait::async_trait;
use clinic_common::db::{DataImport, TussCode};
use clinic_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{codes, imports, TableCount};

/// Storage operations the TUSS pipeline depends on
#[async_trait]
pub trait TussStore: Send + Sync {
    /// Insert-or-ignore one batch; returns rows newly created
    async fn insert_codes(&self, batch: &[TussCode]) -> Result<u64>;

    /// Record a new ledger row (expected in `processing` state)
    async fn begin_import(&self, import: &DataImport) -> Result<()>;

    async fn complete_import(&self, id: Uuid, records_count: i64, version: &str) -> Result<()>;

    async fn fail_import(&self, id: Uuid, error_message: &str) -> Result<()>;

    async fn count_codes(&self) -> Result<i64>;

    async fn count_codes_by_table(&self) -> Result<Vec<TableCount>>;

    async fn last_completed_import(&self, import_type: &str) -> Result<Option<DataImport>>;
}

/// `TussStore` backed by the shared SQLite database
#[derive(Clone)]
pub struct SqliteTussStore {
    pool: SqlitePool,
}

impl SqliteTussStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TussStore for SqliteTussStore {
    async fn insert_codes(&self, batch: &[TussCode]) -> Result<u64> {
        codes::insert_batch(&self.pool, batch).await
    }

    async fn begin_import(&self, import: &DataImport) -> Result<()> {
        imports::insert_import(&self.pool, import).await
    }

    async fn complete_import(&self, id: Uuid, records_count: i64, version: &str) -> Result<()> {
        imports::mark_completed(&self.pool, id, records_count, version).await
    }

    async fn fail_import(&self, id: Uuid, error_message: &str) -> Result<()> {
        imports::mark_failed(&self.pool, id, error_message).await
    }

    async fn count_codes(&self) -> Result<i64> {
        codes::count_codes(&self.pool).await
    }

    async fn count_codes_by_table(&self) -> Result<Vec<TableCount>> {
        codes::count_by_table(&self.pool).await
    }

    async fn last_completed_import(&self, import_type: &str) -> Result<Option<DataImport>> {
        imports::last_completed(&self.pool, import_type).await
    }
}
