//! Ingestion configuration
//!
//! Endpoint, paging and batching settings, read from the environment with
//! defaults matching the public SF311 dataset.

use crate::error::{IngestError, Result};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Socrata host serving the dataset.
pub const DEFAULT_BASE_URL: &str = "https://data.sfgov.org";

/// SF311 cases dataset identifier.
pub const DEFAULT_DATASET_ID: &str = "vw6y-z8j6";

/// Records requested per page during the incremental walk.
pub const DEFAULT_PAGE_SIZE: usize = 50_000;

/// Rows per upsert statement/transaction.
pub const DEFAULT_BATCH_SIZE: usize = 2_000;

/// Per-request HTTP deadline.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Rows pulled by the bulk extract stage.
pub const DEFAULT_EXTRACT_LIMIT: usize = 100_000;

/// Root for the bulk stage files (`raw/` and `clean/` live under it).
pub const DEFAULT_DATA_DIR: &str = "data";

/// Bind parameters written per row by the upsert statement.
pub const PARAMS_PER_ROW: usize = 8;

/// PostgreSQL's ceiling on bind parameters in one statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Largest batch that fits in one statement.
pub const MAX_BATCH_SIZE: usize = MAX_BIND_PARAMS / PARAMS_PER_ROW;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub base_url: String,
    pub dataset_id: String,
    /// Sent as `X-App-Token` when present; raises the source's rate limits
    pub app_token: Option<String>,
    pub page_size: usize,
    pub batch_size: usize,
    pub http_timeout_secs: u64,
    pub extract_limit: usize,
    pub data_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            app_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            extract_limit: DEFAULT_EXTRACT_LIMIT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::config(format!("{} has an invalid value: '{}'", key, value))),
        Err(_) => Ok(None),
    }
}

impl IngestConfig {
    /// Load from environment variables (and `.env`), then validate.
    ///
    /// - `SOCRATA_BASE_URL`, `SF311_DATASET_ID`, `SOCRATA_APP_TOKEN`
    /// - `SF311_PAGE_SIZE`, `SF311_BATCH_SIZE`, `SF311_HTTP_TIMEOUT_SECS`
    /// - `SF311_EXTRACT_LIMIT`, `SF311_DATA_DIR`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            base_url: std::env::var("SOCRATA_BASE_URL").unwrap_or(defaults.base_url),
            dataset_id: std::env::var("SF311_DATASET_ID").unwrap_or(defaults.dataset_id),
            app_token: std::env::var("SOCRATA_APP_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            page_size: env_parse("SF311_PAGE_SIZE")?.unwrap_or(defaults.page_size),
            batch_size: env_parse("SF311_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            http_timeout_secs: env_parse("SF311_HTTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.http_timeout_secs),
            extract_limit: env_parse("SF311_EXTRACT_LIMIT")?.unwrap_or(defaults.extract_limit),
            data_dir: std::env::var("SF311_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(IngestError::config("SOCRATA_BASE_URL cannot be empty"));
        }
        if self.dataset_id.trim().is_empty() {
            return Err(IngestError::config("SF311_DATASET_ID cannot be empty"));
        }
        if self.page_size == 0 {
            return Err(IngestError::config("SF311_PAGE_SIZE must be greater than 0"));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::config(format!(
                "SF311_BATCH_SIZE must be between 1 and {} (got {})",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(IngestError::config("SF311_HTTP_TIMEOUT_SECS must be greater than 0"));
        }
        if self.extract_limit == 0 {
            return Err(IngestError::config("SF311_EXTRACT_LIMIT must be greater than 0"));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// JSON resource endpoint used by the incremental fetcher
    pub fn json_url(&self) -> String {
        format!("{}/resource/{}.json", self.base_url.trim_end_matches('/'), self.dataset_id)
    }

    /// CSV resource endpoint used by the bulk extract
    pub fn csv_url(&self) -> String {
        format!("{}/resource/{}.csv", self.base_url.trim_end_matches('/'), self.dataset_id)
    }

    pub fn raw_csv_path(&self) -> PathBuf {
        self.data_dir.join("raw").join("sf311.csv")
    }

    pub fn clean_csv_path(&self) -> PathBuf {
        self.data_dir.join("clean").join("sf311.csv")
    }
}
