//! SF311 Dashboard Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Read side of the `sf311` store: filtered aggregate queries, a TTL result
//! cache, week-over-week insights, CSV export and a text report.
//!
//! # Example
//!
//! ```no_run
//! use sf311_common::db::{create_pool, DbConfig};
//! use sf311_dashboard::{render_report, Dashboard, DashboardConfig, DashboardFilter, DashboardQueries};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = create_pool(&DbConfig::from_env()?).await?;
//!     let dashboard = Dashboard::new(DashboardQueries::new(pool), &DashboardConfig::from_env()?);
//!
//!     if let Some(bounds) = dashboard.date_bounds().await? {
//!         let filter = DashboardFilter::new(bounds.min, bounds.max)?;
//!         print!("{}", render_report(&dashboard.snapshot(&filter).await?));
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod insights;
pub mod models;
pub mod queries;
pub mod report;
pub mod service;

pub use cache::QueryCache;
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use filter::{DashboardFilter, DateWindow};
pub use insights::{Insights, Mover, MoverWindows};
pub use models::{DailyCount, DateBounds, Dimension, KeyCount, RecentRequest, SliceRow, Summary};
pub use queries::DashboardQueries;
pub use report::{render_report, Report};
pub use service::{Dashboard, DashboardSnapshot};
