//! paperwatch binary: run the pipeline once or on a schedule.

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use paperwatch::config::RunConfig;
use paperwatch::pipeline::{ArtifactStore, RunController};
use paperwatch::schedule::{IntervalUnit, ScheduleSpec, Scheduler, SystemClock};
use paperwatch::secrets::EnvSecretStore;

#[derive(Parser)]
#[command(
    name = "paperwatch",
    version,
    about = "Watches scientific paper sources and sends notifications"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one pipeline run and exit
    Run {
        /// Total retrieval attempts per source
        #[arg(default_value_t = 3)]
        max_retries: u32,

        /// Path to the configuration file
        #[arg(long, default_value = "paperwatch.toml")]
        config: PathBuf,
    },

    /// Run the pipeline repeatedly on a schedule
    Schedule {
        #[command(flatten)]
        cadence: CadenceArgs,

        /// Total retrieval attempts per source, per cycle
        #[arg(long, default_value_t = 3)]
        max_retries: u32,

        /// Path to the configuration file
        #[arg(long, default_value = "paperwatch.toml")]
        config: PathBuf,

        /// Per-cycle log file, overwritten each cycle
        #[arg(long, default_value = "paperwatch.log")]
        log_file: PathBuf,
    },
}

/// Exactly one cadence must be given.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct CadenceArgs {
    /// Run every N minutes
    #[arg(long, value_name = "N")]
    minutes: Option<u32>,

    /// Run every N hours
    #[arg(long, value_name = "N")]
    hours: Option<u32>,

    /// Run every N days
    #[arg(long, value_name = "N")]
    days: Option<u32>,

    /// Run daily at the given local time
    #[arg(long, value_name = "HH:MM", value_parser = parse_time)]
    time: Option<NaiveTime>,

    /// Run every N days at the given local time
    #[arg(
        long = "time_every_days",
        alias = "time-every-days",
        num_args = 2,
        value_names = ["N", "HH:MM"]
    )]
    time_every_days: Option<Vec<String>>,
}

impl CadenceArgs {
    fn to_spec(&self) -> Result<ScheduleSpec> {
        if let Some(count) = self.minutes {
            return Ok(ScheduleSpec::EveryInterval {
                unit: IntervalUnit::Minutes,
                count,
            });
        }
        if let Some(count) = self.hours {
            return Ok(ScheduleSpec::EveryInterval {
                unit: IntervalUnit::Hours,
                count,
            });
        }
        if let Some(count) = self.days {
            return Ok(ScheduleSpec::EveryInterval {
                unit: IntervalUnit::Days,
                count,
            });
        }
        if let Some(time) = self.time {
            return Ok(ScheduleSpec::DailyAt(time));
        }
        if let Some(values) = &self.time_every_days {
            let days: u32 = values[0]
                .parse()
                .with_context(|| format!("invalid day count '{}'", values[0]))?;
            let time = parse_time(&values[1]).map_err(|e| anyhow::anyhow!(e))?;
            return Ok(ScheduleSpec::EveryNDaysAt { days, time });
        }
        // clap's group(required) guarantees one cadence is present
        bail!("no schedule cadence given");
    }
}

fn parse_time(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("invalid time '{}': {}", s, e))
}


fn build_controller(config: RunConfig, max_retries: u32) -> RunController {
    RunController::with_default_collaborators(
        config,
        ArtifactStore::new("."),
        max_retries,
        Arc::new(EnvSecretStore::new()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            max_retries,
            config,
        } => {
            let config = RunConfig::load(&config)?;
            let outcome = build_controller(config, max_retries).execute().await?;
            println!("{}", outcome.summary());
        }

        Commands::Schedule {
            cadence,
            max_retries,
            config,
            log_file,
        } => {
            let spec = cadence.to_spec()?;
            let run_config = RunConfig::load(&config)?;
            // Validate up front so a bad configuration fails at startup,
            // not at the first boundary
            run_config.validate()?;

            let scheduler = Scheduler::new(spec, SystemClock, log_file);
            let cycles = scheduler.run(|| {
                let controller = build_controller(run_config.clone(), max_retries);
                async move { controller.execute().await }
            });

            tokio::select! {
                result = cycles => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted, shutting down");
                }
            }
        }
    }

    Ok(())
}
