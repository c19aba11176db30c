//! Raw CSV -> clean CSV

use super::{ensure_parent, read_csv_records};
use crate::error::Result;
use crate::models::Request;
use crate::normalize::{normalize_with_report, NormalizeReport, CANONICAL_COLUMNS};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use tracing::info;

fn timestamp_cell(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

fn to_row(request: &Request) -> [String; 7] {
    [
        request.request_id.clone(),
        timestamp_cell(Some(request.created_at)),
        timestamp_cell(request.closed_at),
        request.status.clone().unwrap_or_default(),
        request.category.clone().unwrap_or_default(),
        request.subcategory.clone().unwrap_or_default(),
        request.neighborhood.clone().unwrap_or_default(),
    ]
}

/// Write `requests` as a canonical-column CSV
pub fn write_clean_csv(path: &Path, requests: &[Request]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CANONICAL_COLUMNS)?;
    for request in requests {
        writer.write_record(to_row(request))?;
    }
    writer.flush()?;
    Ok(())
}

/// Normalize the raw CSV at `input` and write the clean result to `output`.
pub fn transform_csv(input: &Path, output: &Path) -> Result<NormalizeReport> {
    let raw = read_csv_records(input)?;
    let (requests, report) = normalize_with_report(&raw);

    write_clean_csv(output, &requests)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows = report.output,
        dropped = report.dropped(),
        duplicates = report.duplicates_collapsed,
        "Cleaned CSV written"
    );

    Ok(report)
}
