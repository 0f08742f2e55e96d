//! TUSS import pipeline
//!
//! Stages, leaf first: `downloader` (fetch ZIP) → `archive` (extract CSVs)
//! → `csv_mapper` (typed records) → `persister` (batched insert-or-ignore).
//! `importer` runs them against the ledger; `statistics` reports totals.

pub mod archive;
pub mod csv_mapper;
pub mod downloader;
pub mod error;
pub mod importer;
pub mod persister;
pub mod statistics;

pub use error::ImportError;
pub use importer::{ImportOutcome, ImporterConfig, TussImporter};
pub use statistics::{collect_statistics, TableStatistic, TussStatistics};
