//! TUSS statistics for the management screen

use chrono::{DateTime, Utc};
use clinic_common::db::TUSS_IMPORT_KIND;
use clinic_common::Result;
use serde::Serialize;

use crate::db::TussStore;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableStatistic {
    /// `"{number} - {name}"`
    pub table: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TussStatistics {
    pub total_codes: i64,
    pub codes_by_table: Vec<TableStatistic>,
    /// Start time of the most recent completed import
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_import: Option<DateTime<Utc>>,
}

pub async fn collect_statistics(store: &dyn TussStore) -> Result<TussStatistics> {
    let total_codes = store.count_codes().await?;

    let codes_by_table = store
        .count_codes_by_table()
        .await?
        .into_iter()
        .map(|t| TableStatistic {
            table: format!("{} - {}", t.table_number, t.table_name),
            count: t.count,
        })
        .collect();

    let last_import = store
        .last_completed_import(TUSS_IMPORT_KIND)
        .await?
        .map(|import| import.imported_at);

    Ok(TussStatistics {
        total_codes,
        codes_by_table,
        last_import,
    })
}
