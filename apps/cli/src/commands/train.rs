//! One-shot training command.

use crate::commands::{build_trainer, finish_report, parse_date};
use anyhow::Result;
use meridian_training::TrainerConfig;
use std::path::Path;
use tracing::info;

pub async fn execute(
    config: &TrainerConfig,
    start_date: &str,
    end_date: &str,
    model_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let start = parse_date(start_date, "--start-date")?;
    let end = parse_date(end_date, "--end-date")?;

    // Required settings fail before any data is touched.
    config.data_root()?;

    info!(%start, %end, "starting one-shot training");
    let mut trainer = build_trainer(config)?;
    let report = trainer.train_full(start, end, model_path);
    finish_report(&report, json)
}
