//! ZIP extraction
//!
//! Only `.csv` members are extracted, keeping their relative path inside
//! the archive so same-named files in different folders stay distinct.
//! No checksum validation.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use zip::result::ZipError;

use super::ImportError;

/// A CSV member written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Entry name as stored in the archive (may include folders)
    pub name: String,
    pub path: PathBuf,
}

fn is_csv_entry(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".csv")
}

/// Extract every CSV entry of `zip_path` into `dest_dir` on the blocking pool
pub async fn extract_csv_files(
    zip_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ImportError> {
    let zip_path = zip_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_csv_files_blocking(&zip_path, &dest_dir)).await?
}

/// Synchronous extraction, used from `spawn_blocking`
pub fn extract_csv_files_blocking(
    zip_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ImportError> {
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    std::fs::create_dir_all(dest_dir)?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        if entry.is_dir() || !is_csv_entry(&name) {
            tracing::debug!(entry = %name, "Skipping non-CSV archive entry");
            continue;
        }

        // enclosed_name() rejects absolute paths and `..` components
        let relative = match entry.enclosed_name().map(Path::to_path_buf) {
            Some(relative) => relative,
            None => {
                tracing::warn!(entry = %name, "Skipping archive entry with unsafe path");
                continue;
            }
        };

        let out_path = dest_dir.join(relative);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out).map_err(ZipError::Io)?;

        tracing::debug!(entry = %name, path = %out_path.display(), "Extracted CSV");
        extracted.push(ExtractedFile {
            name,
            path: out_path,
        });
    }

    tracing::info!(count = extracted.len(), "CSV files extracted");
    Ok(extracted)
}
