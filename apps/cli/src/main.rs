//! Meridian CLI - Command-line interface for resumable model training
//!
//! This CLI provides a `meridian` command for running, resuming, and
//! inspecting checkpointed training jobs over date-partitioned data.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{incremental, resume, status, train, versions};

/// Meridian - Resumable training orchestration
///
/// Meridian drives long-running, checkpointed model training over
/// date-partitioned datasets: it discovers unprocessed partitions, trains
/// incrementally, checkpoints after every partition, and resumes exactly
/// where it left off after an interruption.
#[derive(Parser, Debug)]
#[command(
    name = "meridian",
    author,
    version,
    about = "Meridian - Resumable checkpointed training"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (defaults to ./meridian.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train once over a full date range, without checkpoints
    Train {
        /// Start date for training data (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// End date for training data (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,

        /// Path to save the trained model (defaults to the model root)
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Train incrementally with checkpoint support
    ///
    /// Processes every unprocessed partition in the range in chronological
    /// order, writing a checkpoint after each one. Re-running the same
    /// command after an interruption resumes from the last checkpoint.
    TrainIncremental {
        /// Start date for training data (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// End date for training data (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,

        /// Start date for validation data (defaults to the start date)
        #[arg(long)]
        validation_start_date: Option<String>,

        /// End date for validation data (defaults to the end date)
        #[arg(long)]
        validation_end_date: Option<String>,

        /// Checkpoint directory (defaults to the configured one)
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Previous model to continue from
        #[arg(long)]
        previous_model_path: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resume an interrupted run from its checkpoint directory
    Resume {
        /// Checkpoint directory (defaults to the configured one)
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show training progress for a checkpoint directory
    Status {
        /// Checkpoint directory (defaults to the configured one)
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect tracked model versions
    #[command(subcommand)]
    Versions(versions::VersionsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load(args.config.as_deref())?;

    match args.command {
        Command::Train { start_date, end_date, model_path, json } => {
            train::execute(&config, &start_date, &end_date, model_path.as_deref(), json).await?;
        }
        Command::TrainIncremental {
            start_date,
            end_date,
            validation_start_date,
            validation_end_date,
            checkpoint_dir,
            previous_model_path,
            json,
        } => {
            incremental::execute(
                &config,
                incremental::IncrementalArgs {
                    start_date,
                    end_date,
                    validation_start_date,
                    validation_end_date,
                    checkpoint_dir,
                    previous_model_path,
                },
                json,
            )
            .await?;
        }
        Command::Resume { checkpoint_dir, json } => {
            resume::execute(&config, checkpoint_dir.as_deref(), json).await?;
        }
        Command::Status { checkpoint_dir, json } => {
            status::execute(&config, checkpoint_dir.as_deref(), json).await?;
        }
        Command::Versions(cmd) => {
            versions::execute(&config, cmd).await?;
        }
    }

    Ok(())
}
