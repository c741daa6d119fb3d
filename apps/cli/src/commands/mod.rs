//! Subcommand implementations.

pub mod incremental;
pub mod resume;
pub mod status;
pub mod train;
pub mod versions;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use meridian_training::{
    IncrementalTrainer, RunReport, RunStatus, SeasonalNaiveBackend, TrainerConfig,
};
use std::path::{Path, PathBuf};

/// Parse a `YYYY-MM-DD` calendar date argument.
pub fn parse_date(raw: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid {flag}: expected YYYY-MM-DD, got {raw:?}"))
}

/// Checkpoint directory from the flag, falling back to configuration.
pub fn resolve_checkpoint_dir(config: &TrainerConfig, flag: Option<&Path>) -> Result<PathBuf> {
    match flag {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(config.checkpoint_dir()?.to_path_buf()),
    }
}

/// Build the orchestrator with the default fitting backend.
pub fn build_trainer(config: &TrainerConfig) -> Result<IncrementalTrainer> {
    IncrementalTrainer::new(config.clone(), Box::new(SeasonalNaiveBackend::default()))
        .context("failed to initialize trainer")
}

/// Render a run report and fail the process on an error status.
pub fn finish_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }

    if report.status == RunStatus::Error {
        anyhow::bail!("{}", report.message);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    match report.status {
        RunStatus::Completed => println!("{}", "Training completed".bold().green()),
        RunStatus::InProgress => println!("{}", "Training in progress".bold().yellow()),
        RunStatus::Error => println!("{}", "Training failed".bold().red()),
    }
    println!("  {}", report.message);
    println!(
        "  Partitions: {} processed of {} discovered",
        report.processed_partitions, report.total_partitions
    );
    if let Some(dir) = &report.checkpoint_dir {
        println!("  Checkpoints: {}", dir.display().to_string().dimmed());
    }
    if let Some(path) = &report.final_model_path {
        println!("  Model: {}", path.display().to_string().dimmed());
    }
    if let Some(metrics) = &report.performance {
        println!(
            "  Scores: mae={:.6} rmse={:.6} mase={:.6} directional={:.3}",
            metrics.mae, metrics.rmse, metrics.mase, metrics.directional_accuracy
        );
    }
    println!();
}
