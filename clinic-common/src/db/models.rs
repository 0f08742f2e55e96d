//! Database models

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Import kind tag for TUSS runs in `data_imports.import_type`
pub const TUSS_IMPORT_KIND: &str = "tuss";

/// One TUSS terminology entry (`tuss_codes` row without surrogate id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TussCode {
    pub code: String,
    pub description: String,
    pub table_number: String,
    pub table_name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub is_active: bool,
}

/// Import ledger status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Processing => "processing",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImportStatus::Processing)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ImportStatus::Processing),
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(Error::corrupt(
                "data_imports",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// One execution of an import pipeline (`data_imports` row)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataImport {
    pub id: Uuid,
    pub import_type: String,
    /// Free-form label, set to the import date on completion
    pub version: Option<String>,
    pub records_count: i64,
    pub status: ImportStatus,
    pub error_message: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub imported_by: String,
}

impl DataImport {
    /// New ledger entry in `processing` state
    pub fn begin(import_type: &str, imported_by: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            import_type: import_type.to_string(),
            version: None,
            records_count: 0,
            status: ImportStatus::Processing,
            error_message: None,
            imported_at: Utc::now(),
            imported_by: imported_by.to_string(),
        }
    }
}

/// Raw `data_imports` row as stored in SQLite
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DataImportRow {
    pub id: String,
    pub import_type: String,
    pub version: Option<String>,
    pub records_count: i64,
    pub status: String,
    pub error_message: Option<String>,
    pub imported_at: String,
    pub imported_by: String,
}

impl TryFrom<DataImportRow> for DataImport {
    type Error = Error;

    fn try_from(row: DataImportRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::corrupt("data_imports", format!("bad id '{}': {}", row.id, e)))?;
        let imported_at = parse_timestamp(&row.imported_at)
            .map_err(|e| Error::corrupt("data_imports", e))?;

        Ok(DataImport {
            id,
            import_type: row.import_type,
            version: row.version,
            records_count: row.records_count,
            status: row.status.parse()?,
            error_message: row.error_message,
            imported_at,
            imported_by: row.imported_by,
        })
    }
}

/// Format a timestamp the way it is stored (fixed width, sorts lexically)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{}': {}", s, e))
}
