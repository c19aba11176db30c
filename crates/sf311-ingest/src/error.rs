//! Error types for SF311 ingestion

use thiserror::Error;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Everything that can go wrong while ingesting.
///
/// `Transport`, `Storage` and `Config` are fatal for a run. `Parse` is
/// recovered inside the normalizer by treating the field as missing.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Remote source unreachable, non-success status, or undecodable page
    #[error("Transport error: {0}")]
    Transport(String),

    /// A single field failed to coerce
    #[error("Parse error: {0}")]
    Parse(String),

    /// A store read or batch write failed
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the error aborts a run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IngestError::Parse(_))
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Transport(err.to_string())
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::Storage {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<sf311_common::Sf311Error> for IngestError {
    fn from(err: sf311_common::Sf311Error) -> Self {
        match err {
            sf311_common::Sf311Error::Config(msg) => IngestError::Config(msg),
            sf311_common::Sf311Error::Database(e) => IngestError::from(e),
            sf311_common::Sf311Error::Io(e) => IngestError::Io(e),
        }
    }
}
