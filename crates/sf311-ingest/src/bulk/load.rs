//! Clean CSV -> store

use super::read_csv_records;
use crate::error::{IngestError, Result};
use crate::normalize::{normalize_with_report, NormalizeReport};
use crate::store::RequestStore;
use crate::upsert::BatchUpserter;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub normalized: NormalizeReport,
    pub upserted: usize,
}

/// Upsert every row of the clean CSV at `path`.
///
/// A missing or empty file is an error; rows lacking required fields are
/// skipped the same way the incremental path skips them.
pub async fn load_csv<S>(path: &Path, store: &S, batch_size: usize) -> Result<LoadReport>
where
    S: RequestStore + ?Sized,
{
    if !path.exists() {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found; run the transform stage first", path.display()),
        )));
    }

    let raw = read_csv_records(path)?;
    if raw.is_empty() {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} has no rows", path.display()),
        )));
    }
    info!(path = %path.display(), rows = raw.len(), "Loading clean CSV");

    let (requests, normalized) = normalize_with_report(&raw);
    let upserted = BatchUpserter::new(store)
        .with_batch_size(batch_size)
        .upsert(&requests)
        .await?;

    info!(upserted, dropped = normalized.dropped(), "Load complete");

    Ok(LoadReport {
        normalized,
        upserted,
    })
}
