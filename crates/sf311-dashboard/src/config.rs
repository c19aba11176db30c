//! Dashboard settings

use crate::error::{DashboardError, Result};
use std::time::Duration;

/// How long a query result stays fresh.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Zero disables caching
    pub cache_ttl_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl DashboardConfig {
    /// Load from `DASHBOARD_CACHE_TTL_SECS` (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cache_ttl_secs = match std::env::var("DASHBOARD_CACHE_TTL_SECS") {
            Ok(value) => value.trim().parse().map_err(|_| {
                DashboardError::config(format!(
                    "DASHBOARD_CACHE_TTL_SECS has an invalid value: '{}'",
                    value
                ))
            })?,
            Err(_) => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Self { cache_ttl_secs })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
