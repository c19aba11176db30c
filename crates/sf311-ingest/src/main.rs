//! SF311 Ingest - pipeline stages as standalone runs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sf311_common::db::{create_pool, health_check, DbConfig};
use sf311_common::logging::{init_logging, LogConfig, LogLevel};
use sf311_ingest::bulk::{extract_csv, load_csv, transform_csv};
use sf311_ingest::{IngestConfig, IngestPipeline, PgRequestStore, SocrataClient};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sf311-ingest")]
#[command(author, version, about = "SF311 service-request ingestion")]
struct Cli {
    /// Stage to run
    #[command(subcommand)]
    stage: Stage,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Stage {
    /// Fetch everything newer than the stored watermark and upsert it
    Incremental,

    /// Download a CSV snapshot of the newest requests
    Extract,

    /// Normalize the raw CSV snapshot into the clean CSV
    Transform,

    /// Upsert the clean CSV into the store
    Load,
}

async fn connect() -> Result<PgRequestStore> {
    let db_config = DbConfig::from_env()?;
    let pool = create_pool(&db_config)
        .await
        .context("Failed to connect to the database")?;
    health_check(&pool).await.context("Database health check failed")?;
    Ok(PgRequestStore::new(pool))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("sf311-ingest")
        .build()
        .merge_env()?;
    init_logging(&log_config)?;

    let config = IngestConfig::from_env()?;

    match cli.stage {
        Stage::Incremental => {
            let store = connect().await?;
            let source = SocrataClient::new(&config)?;
            let report = IngestPipeline::new(&source, &store, config.batch_size)
                .run()
                .await?;
            info!(
                watermark = %report.watermark,
                fetched = report.fetched,
                upserted = report.upserted,
                "[incremental] done"
            );
        },
        Stage::Extract => {
            let report = extract_csv(&config).await?;
            info!(path = %report.path.display(), bytes = report.bytes, "[extract] done");
        },
        Stage::Transform => {
            let report = transform_csv(&config.raw_csv_path(), &config.clean_csv_path())?;
            info!(rows = report.output, dropped = report.dropped(), "[transform] done");
        },
        Stage::Load => {
            let store = connect().await?;
            let report = load_csv(&config.clean_csv_path(), &store, config.batch_size).await?;
            info!(upserted = report.upserted, "[load] done");
        },
    }

    Ok(())
}
