//! Resume command: continue a run from its persisted training state.

use crate::commands::{build_trainer, finish_report, resolve_checkpoint_dir};
use anyhow::Result;
use meridian_training::TrainerConfig;
use std::path::Path;
use tracing::info;

pub async fn execute(
    config: &TrainerConfig,
    checkpoint_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let checkpoint_dir = resolve_checkpoint_dir(config, checkpoint_dir)?;
    config.data_root()?;

    info!(checkpoint_dir = %checkpoint_dir.display(), "resuming training");
    let mut trainer = build_trainer(config)?;
    let report = trainer.resume_training(&checkpoint_dir);
    finish_report(&report, json)
}
