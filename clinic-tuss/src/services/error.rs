//! Import pipeline errors
//!
//! Every stage returns `Result<_, ImportError>`; the importer turns the
//! error's display text into the ledger message and the API response.
//! Malformed CSV rows are not errors: they are logged and skipped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Remote host answered with a status other than 200
    #[error("Download failed: HTTP {status}")]
    Download { status: u16 },

    /// Connection, TLS, timeout or body read failure
    #[error("Download failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Unreadable or corrupt ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Extracted CSV could not be read
    #[error("Failed to read {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// Batch insert or ledger update failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] clinic_common::Error),

    /// Working directory or download file failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking extraction/parse task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
