//! SF311 Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the SF311 workspace members.
//!
//! # Overview
//!
//! - **Error Handling**: [`Sf311Error`] and the crate [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Database**: connection settings and pool bootstrap for the `sf311` store
//!
//! # Example
//!
//! ```no_run
//! use sf311_common::db::{create_pool, DbConfig};
//! use sf311_common::logging::{init_logging, LogConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let pool = create_pool(&DbConfig::from_env()?).await?;
//!     sf311_common::db::health_check(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, Sf311Error};
