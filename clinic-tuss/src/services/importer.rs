//! TUSS import orchestration
//!
//! One run: ledger row in `processing` → download → extract → map and
//! persist each allow-listed table → exactly one terminal ledger update.
//! The run's working directory is removed whatever the outcome.

use chrono::Utc;
use clinic_common::db::{DataImport, TUSS_IMPORT_KIND};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::archive::extract_csv_files;
use super::csv_mapper::{is_relevant_table, map_csv_file, table_number_from_file_name};
use super::downloader::Downloader;
use super::persister::persist_codes;
use super::ImportError;
use crate::db::TussStore;

/// Public ANS distribution of the TUSS terminology
pub const TUSS_SOURCE_URL: &str =
    "https://ftp.dadosabertos.ans.gov.br/FTP/PDA/terminologia_unificada_saude_suplementar_TUSS/TUSS.zip";

pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

const ARCHIVE_FILE_NAME: &str = "TUSS.zip";
const EXTRACT_DIR_NAME: &str = "csv";

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub source_url: String,
    /// Parent of the per-run directories
    pub work_dir: PathBuf,
    pub download_timeout: Duration,
}

impl ImporterConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_url: TUSS_SOURCE_URL.to_string(),
            work_dir: work_dir.into(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}

/// Result reported to the caller of an import
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_imported: Option<i64>,
}

impl ImportOutcome {
    fn completed(records: i64) -> Self {
        Self {
            success: true,
            message: format!(
                "Import completed successfully! {} TUSS codes imported.",
                records
            ),
            records_imported: Some(records),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            records_imported: None,
        }
    }
}

/// Runs TUSS imports against a caller-supplied store
pub struct TussImporter {
    config: ImporterConfig,
    downloader: Downloader,
}

impl TussImporter {
    pub fn new(config: ImporterConfig) -> Result<Self, ImportError> {
        let downloader = Downloader::new(config.download_timeout)?;
        Ok(Self { config, downloader })
    }

    /// Run one import; every failure is folded into the outcome
    pub async fn import(&self, store: &dyn TussStore, imported_by: &str) -> ImportOutcome {
        let record = DataImport::begin(TUSS_IMPORT_KIND, imported_by);
        let import_id = record.id;

        if let Err(e) = store.begin_import(&record).await {
            tracing::error!(error = %e, "Could not create import ledger row");
            return ImportOutcome::failed(ImportError::from(e).to_string());
        }

        tracing::info!(
            import_id = %import_id,
            imported_by = %imported_by,
            url = %self.config.source_url,
            "TUSS import started"
        );

        let run_dir = self.run_dir(import_id);
        let result = self.run(store, &run_dir).await;
        remove_run_dir(&run_dir).await;

        match result {
            Ok(total) => {
                let total = total as i64;
                let version = Utc::now().format("%Y-%m-%d").to_string();
                match store.complete_import(import_id, total, &version).await {
                    Ok(()) => {
                        tracing::info!(
                            import_id = %import_id,
                            records = total,
                            version = %version,
                            "TUSS import completed"
                        );
                        ImportOutcome::completed(total)
                    }
                    Err(e) => {
                        let message = ImportError::from(e).to_string();
                        record_failure(store, import_id, &message).await;
                        ImportOutcome::failed(message)
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                record_failure(store, import_id, &message).await;
                ImportOutcome::failed(message)
            }
        }
    }

    fn run_dir(&self, import_id: Uuid) -> PathBuf {
        self.config.work_dir.join(format!("tuss-{}", import_id))
    }

    /// Pipeline body; returns the number of records submitted
    async fn run(&self, store: &dyn TussStore, run_dir: &Path) -> Result<usize, ImportError> {
        tokio::fs::create_dir_all(run_dir).await?;

        let zip_path = self
            .downloader
            .download(&self.config.source_url, &run_dir.join(ARCHIVE_FILE_NAME))
            .await?;

        let files = extract_csv_files(&zip_path, &run_dir.join(EXTRACT_DIR_NAME)).await?;

        let mut total = 0;
        for file in files {
            let table_number = table_number_from_file_name(&file.name);
            if !is_relevant_table(&table_number) {
                tracing::debug!(file = %file.name, table = %table_number, "Table not imported");
                continue;
            }

            let path = file.path.clone();
            let table = table_number.clone();
            let mapped = tokio::task::spawn_blocking(move || map_csv_file(&path, &table)).await??;

            let submitted = persist_codes(store, &mapped.records).await?;
            tracing::info!(
                file = %file.name,
                table = %table_number,
                records = submitted,
                "Table imported"
            );
            total += submitted;
        }

        Ok(total)
    }
}

async fn record_failure(store: &dyn TussStore, import_id: Uuid, message: &str) {
    tracing::error!(import_id = %import_id, error = %message, "TUSS import failed");
    if let Err(e) = store.fail_import(import_id, message).await {
        tracing::error!(
            import_id = %import_id,
            error = %e,
            "Could not mark import as failed"
        );
    }
}

async fn remove_run_dir(run_dir: &Path) {
    match tokio::fs::remove_dir_all(run_dir).await {
        Ok(()) => tracing::debug!(path = %run_dir.display(), "Working directory removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %run_dir.display(),
            error = %e,
            "Failed to remove working directory"
        ),
    }
}
