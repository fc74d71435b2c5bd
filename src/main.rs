//! Sentinel CLI - LLM-summarized alert reports from popularity feeds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use sentinel_backend::config::{ReportKind, SentinelConfig};
use sentinel_backend::daemon::CycleOutcome;
use sentinel_backend::runtime::ReportingRuntimeBuilder;
use sentinel_backend::schedule::stop_channel;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Alert aggregation and LLM report generation")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to sentinel.toml next to the binary, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single report cycle and print the report
    Report {
        /// Time range to analyze, in hours
        #[arg(long, default_value = "24")]
        hours: u64,

        /// Report flavour (defaults to the configured one)
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Also write the report into the reports directory
        #[arg(long)]
        save: bool,
    },

    /// Run the reporting loop until Ctrl-C
    Daemon,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Alerts,
    Trends,
}

impl From<KindArg> for ReportKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Alerts => ReportKind::Alerts,
            KindArg::Trends => ReportKind::Trends,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else {
        "warn,sentinel=info,sentinel_backend=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = SentinelConfig::load(cli.config.as_deref())?;
    let rt = tokio::runtime::Runtime::new().context("failed to start runtime")?;

    match cli.command {
        Commands::Report { hours, kind, save } => {
            let mut config = config.with_window_hours(hours);
            if let Some(kind) = kind {
                config.report_kind = kind.into();
            }
            let mut reporting = ReportingRuntimeBuilder::new(config)
                .persist(save)
                .build()
                .context("failed to build reporting pipeline")?;

            match rt.block_on(reporting.run_once()) {
                CycleOutcome::Success(summary) => {
                    print!("{}", summary.document.to_markdown());
                    if let Some(path) = summary.saved_to {
                        tracing::info!("Report saved to {}", path.display());
                    }
                    Ok(())
                }
                CycleOutcome::Failure(error) => anyhow::bail!("report cycle failed: {}", error),
            }
        }
        Commands::Daemon => {
            let mut reporting = ReportingRuntimeBuilder::new(config)
                .build()
                .context("failed to build reporting pipeline")?;

            rt.block_on(async {
                let (stop, signal) = stop_channel();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("Ctrl-C received, stopping");
                        stop.stop();
                    }
                });
                reporting.run(signal).await;
            });
            Ok(())
        }
    }
}
