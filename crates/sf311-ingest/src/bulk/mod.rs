//! One-shot bulk stages
//!
//! The non-incremental path: `extract` downloads a CSV snapshot, `transform`
//! rewrites it with canonical columns, `load` upserts the clean file. They
//! share the incremental pipeline's normalizer and upserter.

pub mod extract;
pub mod load;
pub mod transform;

pub use extract::{extract_csv, ExtractReport};
pub use load::{load_csv, LoadReport};
pub use transform::transform_csv;

use crate::error::Result;
use crate::models::RawRecord;
use serde_json::Value;
use std::path::Path;

/// Read a headed CSV file into field-keyed records.
///
/// Every cell becomes a JSON string; blank cells are left for the normalizer
/// to treat as missing.
pub fn read_csv_records(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
