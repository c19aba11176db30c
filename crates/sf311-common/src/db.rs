//! Database connection settings and pool bootstrap
//!
//! Every component receives the resulting [`PgPool`] explicitly; nothing in the
//! workspace keeps a process-wide connection.

use crate::error::{Result, Sf311Error};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Default maximum connections. Ingestion is sequential, so the pool stays small.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default minimum idle connections.
pub const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;

/// Default connection acquire timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

impl DbConfig {
    /// Build a config for `url` with default pool settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            min_connections: DEFAULT_DB_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: Some(600),
            max_lifetime_secs: Some(1800),
        }
    }

    /// Load from the environment (and `.env`, if present).
    ///
    /// `DATABASE_URL` is required. `DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`,
    /// `DB_CONNECT_TIMEOUT`, `DB_IDLE_TIMEOUT` and `DB_MAX_LIFETIME` are
    /// optional; a value that does not parse is a configuration error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("DATABASE_URL")
            .map_err(|_| Sf311Error::config("DATABASE_URL not set"))?;
        let defaults = Self::new(url);

        let config = Self {
            max_connections: env_number("DB_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            min_connections: env_number("DB_MIN_CONNECTIONS")?.unwrap_or(defaults.min_connections),
            connect_timeout_secs: env_number("DB_CONNECT_TIMEOUT")?
                .unwrap_or(defaults.connect_timeout_secs),
            idle_timeout_secs: env_number("DB_IDLE_TIMEOUT")?.or(defaults.idle_timeout_secs),
            max_lifetime_secs: env_number("DB_MAX_LIFETIME")?.or(defaults.max_lifetime_secs),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Sf311Error::config("DATABASE_URL cannot be empty"));
        }

        if self.max_connections == 0 {
            return Err(Sf311Error::config("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        if self.min_connections > self.max_connections {
            return Err(Sf311Error::config(format!(
                "DB_MIN_CONNECTIONS ({}) cannot be greater than DB_MAX_CONNECTIONS ({})",
                self.min_connections, self.max_connections
            )));
        }

        Ok(())
    }

    /// Connection URL with the password masked, safe for logs
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((credentials, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };
        match credentials.split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
            None => self.url.clone(),
        }
    }

    /// Pool options for these settings
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .idle_timeout(self.idle_timeout_secs.map(Duration::from_secs))
            .max_lifetime(self.max_lifetime_secs.map(Duration::from_secs))
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Sf311Error::config(format!("{} must be a number, got '{}'", key, raw))),
        _ => Ok(None),
    }
}

/// Connect a pool; the caller owns it and passes it where it is needed.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    config.validate()?;
    let pool = config.pool_options().connect(&config.url).await?;

    tracing::info!(
        url = %config.redacted_url(),
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );

    Ok(pool)
}

/// Round-trip a trivial query
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
