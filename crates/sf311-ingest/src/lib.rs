//! SF311 Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Incremental ingestion of the San Francisco 311 dataset into PostgreSQL.
//!
//! # Components
//!
//! - [`normalize`]: raw source records to canonical [`Request`]s
//! - [`fetch`]: paginated reads from the Socrata API since a watermark
//! - [`watermark`]: latest stored event time, or the 2000-01-01 floor
//! - [`upsert`]: fixed-size, independently committed upsert batches
//! - [`pipeline`]: runs the stages above in order and reports counts
//! - [`bulk`]: one-shot CSV extract, transform and load
//!
//! # Example
//!
//! ```no_run
//! use sf311_common::db::{create_pool, DbConfig};
//! use sf311_ingest::{IngestConfig, IngestPipeline, PgRequestStore, SocrataClient};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let store = PgRequestStore::new(create_pool(&DbConfig::from_env()?).await?);
//!     let source = SocrataClient::new(&config)?;
//!
//!     let report = IngestPipeline::new(&source, &store, config.batch_size).run().await?;
//!     println!("upserted {} rows", report.upserted);
//!     Ok(())
//! }
//! ```

pub mod bulk;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod upsert;
pub mod watermark;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use fetch::{RecordSource, SocrataClient};
pub use models::{epoch_floor, RawRecord, Request};
pub use normalize::{normalize, normalize_with_report, NormalizeReport};
pub use pipeline::{IngestPipeline, PipelineError, PipelineReport, PipelineStage};
pub use store::{PgRequestStore, RequestStore};
pub use upsert::BatchUpserter;
pub use watermark::WatermarkResolver;
