//! Rows returned by dashboard queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Placeholder key for rows whose grouping column is null.
pub const UNKNOWN_KEY: &str = "(unknown)";

/// Earliest and latest calendar day present in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    /// Clamp an optional requested range into the stored span
    pub fn clamp(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
        let start = start.unwrap_or(self.min).clamp(self.min, self.max);
        let end = end.unwrap_or(self.max).clamp(self.min, self.max);
        (start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub requests: i64,
}

/// Request count for one category, neighborhood or status value
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KeyCount {
    pub key: String,
    pub requests: i64,
}

impl KeyCount {
    pub fn new(key: impl Into<String>, requests: i64) -> Self {
        Self {
            key: key.into(),
            requests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Summary {
    pub total_requests: i64,
    /// Rows whose status starts with "open", any case
    pub open_count: i64,
    /// `None` when nothing in scope has closed
    pub median_resolve_hours: Option<f64>,
}

impl Summary {
    pub fn open_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.open_count as f64 / self.total_requests as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RecentRequest {
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub neighborhood: Option<String>,
}

/// One exported row; field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SliceRow {
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub neighborhood: Option<String>,
}

/// Columns the week-over-week movers can group by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Category,
    Neighborhood,
}

impl Dimension {
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Neighborhood => "neighborhood",
        }
    }
}
