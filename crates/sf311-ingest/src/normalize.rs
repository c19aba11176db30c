//! Record normalization
//!
//! Turns source records (any key casing, partial fields, string timestamps)
//! into canonical [`Request`]s:
//!
//! 1. map source field names onto canonical attributes
//! 2. coerce `created_at` / `closed_at`, nulling anything unparsable
//! 3. drop records without `request_id` or `created_at`
//! 4. collapse duplicate ids, keeping the last occurrence's values
//!
//! No I/O happens here.

use crate::error::{IngestError, Result};
use crate::models::{RawRecord, Request};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// Source field names requested from the dataset, in `$select` order.
pub const SOURCE_FIELDS: [&str; 7] = [
    "service_request_id",
    "requested_datetime",
    "closed_date",
    "status_description",
    "service_name",
    "service_subtype",
    "neighborhoods_sffind_boundaries",
];

/// Source field carrying the event time; drives `$where` and `$order`.
pub const EVENT_TIME_FIELD: &str = "requested_datetime";

/// Canonical column order, as written to clean CSV files.
pub const CANONICAL_COLUMNS: [&str; 7] = [
    "request_id",
    "created_at",
    "closed_at",
    "status",
    "category",
    "subcategory",
    "neighborhood",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    RequestId,
    CreatedAt,
    ClosedAt,
    Status,
    Category,
    Subcategory,
    Neighborhood,
}

/// Resolve a key (source or canonical name, any casing) to its attribute.
/// The flag is true for the source name, which outranks the canonical alias.
fn field_for_key(key: &str) -> Option<(Field, bool)> {
    let resolved = match key.trim().to_ascii_lowercase().as_str() {
        "service_request_id" => (Field::RequestId, true),
        "requested_datetime" => (Field::CreatedAt, true),
        "closed_date" => (Field::ClosedAt, true),
        "status_description" => (Field::Status, true),
        "service_name" => (Field::Category, true),
        "service_subtype" => (Field::Subcategory, true),
        "neighborhoods_sffind_boundaries" => (Field::Neighborhood, true),
        "request_id" => (Field::RequestId, false),
        "created_at" => (Field::CreatedAt, false),
        "closed_at" => (Field::ClosedAt, false),
        "status" => (Field::Status, false),
        "category" => (Field::Category, false),
        "subcategory" => (Field::Subcategory, false),
        "neighborhood" => (Field::Neighborhood, false),
        _ => return None,
    };
    Some(resolved)
}

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Parse a source timestamp. Offset-less values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| IngestError::parse(format!("unrecognized timestamp '{}'", value)))
}

/// Scalar JSON value as trimmed text; `None` for null, blanks and containers.
fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Counts describing one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub input: usize,
    pub output: usize,
    pub missing_request_id: usize,
    pub missing_created_at: usize,
    pub duplicates_collapsed: usize,
    /// Values present in the source but coerced to missing
    pub coerced_fields: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.missing_request_id + self.missing_created_at
    }
}

#[derive(Default)]
struct Partial {
    request_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    status: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    neighborhood: Option<String>,
}

fn coerce_timestamp(value: &Value, coerced: &mut usize) -> Option<DateTime<Utc>> {
    let text = match value {
        Value::Null => return None,
        other => text_value(other),
    };
    match text.as_deref().map(parse_timestamp) {
        Some(Ok(ts)) => Some(ts),
        Some(Err(e)) => {
            tracing::trace!(error = %e, "Timestamp coerced to missing");
            *coerced += 1;
            None
        },
        None => {
            if !matches!(value, Value::String(_)) {
                *coerced += 1;
            }
            None
        },
    }
}

fn project(raw: &RawRecord, coerced: &mut usize) -> Partial {
    let mut partial = Partial::default();

    let fields: Vec<(Field, bool, &Value)> = raw
        .iter()
        .filter_map(|(key, value)| field_for_key(key).map(|(field, source)| (field, source, value)))
        .collect();
    let sourced: Vec<Field> = fields
        .iter()
        .filter(|(_, source, _)| *source)
        .map(|(field, _, _)| *field)
        .collect();

    for (field, source, value) in fields {
        if !source && sourced.contains(&field) {
            continue;
        }

        match field {
            Field::CreatedAt => partial.created_at = coerce_timestamp(value, coerced),
            Field::ClosedAt => partial.closed_at = coerce_timestamp(value, coerced),
            other => {
                if matches!(value, Value::Array(_) | Value::Object(_)) {
                    *coerced += 1;
                }
                let text = text_value(value);
                match other {
                    Field::RequestId => partial.request_id = text,
                    Field::Status => partial.status = text,
                    Field::Category => partial.category = text,
                    Field::Subcategory => partial.subcategory = text,
                    Field::Neighborhood => partial.neighborhood = text,
                    Field::CreatedAt | Field::ClosedAt => {},
                }
            },
        }
    }

    partial
}

/// Normalize raw records into canonical requests. See the module docs.
pub fn normalize(raw: &[RawRecord]) -> Vec<Request> {
    normalize_with_report(raw).0
}

/// Like [`normalize`], also returning what was dropped or coerced.
pub fn normalize_with_report(raw: &[RawRecord]) -> (Vec<Request>, NormalizeReport) {
    let mut report = NormalizeReport {
        input: raw.len(),
        ..NormalizeReport::default()
    };
    let mut rows: Vec<Request> = Vec::with_capacity(raw.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(raw.len());

    for record in raw {
        let partial = project(record, &mut report.coerced_fields);

        let Some(request_id) = partial.request_id else {
            report.missing_request_id += 1;
            continue;
        };
        let Some(created_at) = partial.created_at else {
            report.missing_created_at += 1;
            continue;
        };

        let mut request = Request::new(request_id, created_at);
        request.closed_at = partial.closed_at;
        request.status = partial.status;
        request.category = partial.category;
        request.subcategory = partial.subcategory;
        request.neighborhood = partial.neighborhood;

        match positions.get(&request.request_id) {
            Some(&idx) => {
                rows[idx] = request;
                report.duplicates_collapsed += 1;
            },
            None => {
                positions.insert(request.request_id.clone(), rows.len());
                rows.push(request);
            },
        }
    }

    report.output = rows.len();
    (rows, report)
}
