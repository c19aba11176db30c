//! SF311 Dashboard - text report over the sf311 store

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use sf311_common::db::{create_pool, health_check, DbConfig};
use sf311_common::logging::{init_logging, LogConfig, LogLevel};
use sf311_dashboard::export::{export_path, export_slice};
use sf311_dashboard::report::NO_DATA_MESSAGE;
use sf311_dashboard::{render_report, Dashboard, DashboardConfig, DashboardFilter, DashboardQueries};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sf311-dashboard")]
#[command(author, version, about = "SF311 city operations report")]
struct Cli {
    /// First day to include (YYYY-MM-DD); defaults to the earliest stored day
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD); defaults to the latest stored day
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Restrict to a category; repeat for several
    #[arg(short, long = "category")]
    categories: Vec<String>,

    /// Write the filtered rows to this CSV file (or directory)
    #[arg(long)]
    export: Option<PathBuf>,

    /// List the stored categories and exit
    #[arg(long)]
    list_categories: bool,

    /// Bypass cached results: clear the cache before every render
    #[arg(long)]
    refresh: bool,

    /// Re-render every N seconds until interrupted; SIGHUP forces a refresh
    /// and an immediate re-render
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// SIGHUP as a manual refresh trigger. Pends forever off unix or when the
/// handler cannot be installed.
struct RefreshTrigger {
    #[cfg(unix)]
    hangup: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl RefreshTrigger {
    fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let hangup = signal(SignalKind::hangup())
            .map_err(|e| warn!(error = %e, "Failed to install SIGHUP handler"))
            .ok();
        Self { hangup }
    }

    async fn fired(&mut self) {
        if let Some(hangup) = self.hangup.as_mut() {
            if hangup.recv().await.is_some() {
                return;
            }
            self.hangup = None;
        }
        std::future::pending::<()>().await
    }
}

#[cfg(not(unix))]
impl RefreshTrigger {
    fn install() -> Self {
        Self {}
    }

    async fn fired(&mut self) {
        std::future::pending::<()>().await
    }
}

/// One render; returns false when the store is empty
async fn render(dashboard: &Dashboard, cli: &Cli) -> Result<bool> {
    dashboard.prepare_render();

    let Some(bounds) = dashboard.date_bounds().await? else {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(false);
    };

    let (start, end) = bounds.clamp(cli.start, cli.end);
    let filter = DashboardFilter::new(start, end)?.with_categories(cli.categories.iter().cloned());

    let snapshot = dashboard.snapshot(&filter).await?;
    print!("{}", render_report(&snapshot));

    if let Some(target) = &cli.export {
        let rows = dashboard.slice(&filter).await?;
        let path = export_path(target, &filter);
        let written = export_slice(&path, &rows)
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        info!(path = %path.display(), rows = written, "Exported filtered slice");
    }

    Ok(true)
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
        .log_file_prefix("sf311-dashboard")
        .build()
        .merge_env()?;
    init_logging(&log_config)?;

    let pool = create_pool(&DbConfig::from_env()?)
        .await
        .context("Failed to connect to the database")?;
    health_check(&pool).await.context("Database health check failed")?;
    let dashboard = Dashboard::new(DashboardQueries::new(pool), &DashboardConfig::from_env()?)
        .with_refresh_each_render(cli.refresh);

    if cli.list_categories {
        for category in dashboard.categories().await? {
            println!("{}", category);
        }
        return Ok(());
    }

    let Some(secs) = cli.interval else {
        render(&dashboard, &cli).await?;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    let mut trigger = RefreshTrigger::install();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = render(&dashboard, &cli).await {
                    warn!(error = %e, "Render failed; retrying next tick");
                }
            }
            _ = trigger.fired() => {
                info!("SIGHUP received");
                dashboard.refresh();
                if let Err(e) = render(&dashboard, &cli).await {
                    warn!(error = %e, "Render failed; retrying next tick");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
        }
    }
}
