//! Checkpointed incremental training command.

use crate::commands::{build_trainer, finish_report, parse_date, resolve_checkpoint_dir};
use anyhow::Result;
use meridian_training::{TrainerConfig, TrainingRequest};
use std::path::PathBuf;
use tracing::info;

pub struct IncrementalArgs {
    pub start_date: String,
    pub end_date: String,
    pub validation_start_date: Option<String>,
    pub validation_end_date: Option<String>,
    pub checkpoint_dir: Option<PathBuf>,
    pub previous_model_path: Option<PathBuf>,
}

pub async fn execute(config: &TrainerConfig, args: IncrementalArgs, json: bool) -> Result<()> {
    let start = parse_date(&args.start_date, "--start-date")?;
    let end = parse_date(&args.end_date, "--end-date")?;

    // Validation dates default to the training range.
    let validation_start = match args.validation_start_date.as_deref() {
        Some(raw) => parse_date(raw, "--validation-start-date")?,
        None => start,
    };
    let validation_end = match args.validation_end_date.as_deref() {
        Some(raw) => parse_date(raw, "--validation-end-date")?,
        None => end,
    };

    config.data_root()?;
    let checkpoint_dir = resolve_checkpoint_dir(config, args.checkpoint_dir.as_deref())?;

    info!(%start, %end, checkpoint_dir = %checkpoint_dir.display(), "starting incremental training");
    let mut trainer = build_trainer(config)?;
    let report = trainer.train_with_checkpoints(&TrainingRequest {
        start_date: start,
        end_date: end,
        validation_start_date: validation_start,
        validation_end_date: validation_end,
        checkpoint_dir,
        previous_model_path: args.previous_model_path,
    });
    finish_report(&report, json)
}
