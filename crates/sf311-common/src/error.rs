//! Error types shared across SF311 crates

use thiserror::Error;

/// Result type alias for shared SF311 operations
pub type Result<T> = std::result::Result<T, Sf311Error>;

/// Errors raised by the shared bootstrap code (configuration, pool setup)
#[derive(Error, Debug)]
pub enum Sf311Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required setting is missing or malformed
    #[error("Configuration error: {0}. Check DATABASE_URL and the SF311_* environment variables.")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Sf311Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
