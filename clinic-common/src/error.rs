//! Error type shared by the clinic crates

use thiserror::Error;

/// Result alias used throughout `clinic-common` and its callers
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by configuration, database bootstrap and row decoding
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure (root folder, database directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored row holds a value that cannot be decoded (bad UUID, timestamp, status)
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// Row missing, or not in the state an update expects
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub(crate) fn corrupt(table: &'static str, reason: impl Into<String>) -> Self {
        Error::CorruptRow {
            table,
            reason: reason.into(),
        }
    }
}
