//! CSV export of the filtered slice

use crate::error::Result;
use crate::filter::DashboardFilter;
use crate::models::SliceRow;
use std::io::Write;
use std::path::{Path, PathBuf};

const EXPORT_COLUMNS: [&str; 7] = [
    "request_id",
    "created_at",
    "closed_at",
    "status",
    "category",
    "subcategory",
    "neighborhood",
];

/// `sf311_<start>_<end>.csv`
pub fn export_file_name(filter: &DashboardFilter) -> String {
    format!("sf311_{}_{}.csv", filter.start(), filter.end())
}

/// Resolve `--export`: a directory gets the default file name appended
pub fn export_path(target: &Path, filter: &DashboardFilter) -> PathBuf {
    if target.is_dir() {
        target.join(export_file_name(filter))
    } else {
        target.to_path_buf()
    }
}

/// Write the header and `rows`; returns the number of data rows.
pub fn write_slice<W: Write>(writer: W, rows: &[SliceRow]) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(EXPORT_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

pub fn export_slice(path: &Path, rows: &[SliceRow]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_slice(file, rows)
}
