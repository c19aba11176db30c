//! Raw and canonical record shapes

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A record exactly as the source returned it: field name -> JSON value.
///
/// Keys follow the source's naming and casing; values may be absent, null,
/// strings or numbers.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Name of the relation holding canonical requests.
pub const TABLE_NAME: &str = "sf311";

/// Lower bound used when the store holds no rows yet: 2000-01-01T00:00:00Z.
pub fn epoch_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Canonical 311 service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Request {
    /// Stable external identifier; the upsert key
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub neighborhood: Option<String>,
    /// Opaque payload kept for forward compatibility; written on insert only
    #[serde(default = "empty_raw")]
    pub raw: serde_json::Value,
}

fn empty_raw() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Request {
    /// A request with only the required fields set
    pub fn new(request_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            request_id: request_id.into(),
            created_at,
            closed_at: None,
            status: None,
            category: None,
            subcategory: None,
            neighborhood: None,
            raw: empty_raw(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_closed_at(mut self, closed_at: DateTime<Utc>) -> Self {
        self.closed_at = Some(closed_at);
        self
    }

    /// Copy the six mutable columns from `newer`, keeping id and `raw`.
    ///
    /// Mirrors the store's `ON CONFLICT DO UPDATE` rule.
    pub fn apply_update(&mut self, newer: &Request) {
        self.created_at = newer.created_at;
        self.closed_at = newer.closed_at;
        self.status = newer.status.clone();
        self.category = newer.category.clone();
        self.subcategory = newer.subcategory.clone();
        self.neighborhood = newer.neighborhood.clone();
    }
}
