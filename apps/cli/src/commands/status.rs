//! Status command: derived progress view over a checkpoint directory.

use crate::commands::resolve_checkpoint_dir;
use anyhow::{Context, Result};
use colored::Colorize;
use meridian_training::{CheckpointStore, ProgressStatus, TrainerConfig};
use std::path::Path;

pub async fn execute(
    config: &TrainerConfig,
    checkpoint_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let checkpoint_dir = resolve_checkpoint_dir(config, checkpoint_dir)?;
    let store = CheckpointStore::open(&checkpoint_dir)
        .with_context(|| format!("cannot open checkpoint directory {}", checkpoint_dir.display()))?;

    let progress = store.training_progress();
    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
        return Ok(());
    }

    println!();
    match progress.status {
        ProgressStatus::NotStarted => {
            println!("{}", "Training not started".bold().yellow());
            println!("  {}", "No checkpoints found in this directory.".dimmed());
        }
        ProgressStatus::InProgress => {
            println!("{}", "Training in progress".bold().cyan());
            if let Some(last) = progress.last_processed {
                println!("  Last processed: {last}");
            }
            println!("  Checkpoints: {}", progress.total_checkpoints);
            if let Some(time) = progress.last_checkpoint_time {
                println!("  Last checkpoint: {}", time.to_rfc3339().dimmed());
            }
        }
    }
    println!();
    Ok(())
}
