//! Batched persistence of mapped codes

use clinic_common::db::TussCode;

use super::ImportError;
use crate::db::TussStore;

/// Rows per insert statement
pub const BATCH_SIZE: usize = 1000;

/// Insert `records` in consecutive batches of `BATCH_SIZE`
///
/// Returns the number of records submitted. Codes already stored are ignored
/// by the store, so the submitted count can exceed the rows created.
pub async fn persist_codes(store: &dyn TussStore, records: &[TussCode]) -> Result<usize, ImportError> {
    let mut inserted: u64 = 0;

    for (index, batch) in records.chunks(BATCH_SIZE).enumerate() {
        let created = store.insert_codes(batch).await?;
        inserted += created;
        tracing::debug!(
            batch = index,
            size = batch.len(),
            created,
            ignored = batch.len() as u64 - created,
            "Batch persisted"
        );
    }

    tracing::info!(
        submitted = records.len(),
        inserted,
        "Codes persisted"
    );
    Ok(records.len())
}
