use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use killfeed_core::{WorkItem, parse_day};
use killfeed_history::{Direction, ReconcileRequest};
use killfeed_pipeline::RunMode;
use killfeed_runner::{App, KillfeedConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "killfeed", version, about = "Killmail crawl-and-ingest service")]
struct Cli {
    /// Load configuration from a JSON file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Health loops, live feed and importer until Ctrl-C
    Serve,

    /// Health loops and importer only
    Import {
        #[arg(long)]
        max_concurrency: Option<usize>,
        #[arg(long)]
        spacing_ms: Option<u64>,
        /// Exit once the queue stays empty
        #[arg(long)]
        drain: bool,
    },

    /// Queue killmails by hand
    Add {
        /// `<id>:<hash>`
        #[arg(required = true)]
        items: Vec<WorkItem>,
    },

    /// Reconcile stored killmails against daily totals
    History {
        /// YYYYMMDD, defaults to yesterday (UTC)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        /// YYYYMMDD, defaults to the start date
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "forward")]
        direction: Direction,
        /// Only compare counts
        #[arg(long)]
        stats: bool,
    },

    /// Run the health tracker alone, logging transitions
    Tracking,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_day(s).ok_or_else(|| format!("expected YYYYMMDD, got {:?}", s))
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = KillfeedConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config.log_level);

    let app = App::build(config).context("starting killfeed")?;

    let trigger = app.shutdown_trigger();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            trigger.send_replace(true);
        }
    });

    match cli.command {
        Command::Serve => {
            let summary = app.serve().await?;
            tracing::info!(
                "Stopped: {} imported, {} skipped, {} dropped",
                summary.imported,
                summary.skipped,
                summary.dropped
            );
        }
        Command::Import {
            max_concurrency,
            spacing_ms,
            drain,
        } => {
            let mode = if drain { RunMode::Drain } else { RunMode::Service };
            let mut importer = app.config().importer_config(mode);
            if let Some(n) = max_concurrency {
                anyhow::ensure!(n > 0, "--max-concurrency must be at least 1");
                importer.max_concurrency = n;
            }
            if let Some(ms) = spacing_ms {
                importer.spacing = std::time::Duration::from_millis(ms);
            }
            let summary = app.import(importer).await?;
            tracing::info!(
                "Import finished: {} imported, {} skipped, {} dropped",
                summary.imported,
                summary.skipped,
                summary.dropped
            );
        }
        Command::Add { items } => {
            let queued = app.add(&items).await.context("queueing items")?;
            tracing::info!("Queued {} killmails", queued);
        }
        Command::History {
            start,
            end,
            direction,
            stats,
        } => {
            let default = ReconcileRequest::yesterday(app.today());
            let start = start.unwrap_or(default.start);
            let request = ReconcileRequest {
                start,
                end: end.unwrap_or(start),
                direction,
                stats_only: stats,
            };
            let report = app.history(&request).await.context("reconciliation aborted")?;
            for day in &report.days {
                tracing::info!(
                    "{}: {} / {} (was {}, enqueued {})",
                    day.date,
                    day.local_after,
                    day.total,
                    day.local_before,
                    day.enqueued
                );
            }
            tracing::info!(
                "Reconciled {} days, {} enqueued, {} still missing",
                report.days.len(),
                report.enqueued(),
                report.missing()
            );
        }
        Command::Tracking => {
            app.tracking().await?;
        }
    }

    Ok(())
}
