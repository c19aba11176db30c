//! Error types for the dashboard read side

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Filter arguments that cannot describe a date range
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Not enough days for a week-over-week comparison.
    ///
    /// Expected whenever the selected range is short; callers show a note
    /// instead of the insight.
    #[error("Not enough history: need {required} days, have {available}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DashboardError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter(message.into())
    }

    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, Self::InsufficientHistory { .. })
    }
}

impl From<sf311_common::Sf311Error> for DashboardError {
    fn from(err: sf311_common::Sf311Error) -> Self {
        match err {
            sf311_common::Sf311Error::Database(e) => Self::Database(e),
            sf311_common::Sf311Error::Io(e) => Self::Io(e),
            sf311_common::Sf311Error::Config(msg) => Self::Config(msg),
        }
    }
}
