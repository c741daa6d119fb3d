//! Version registry views.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use meridian_training::{TrainerConfig, VersionRegistry};

#[derive(Subcommand, Debug)]
pub enum VersionsCommand {
    /// List tracked model versions, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current/previous pointers and the full tracked history
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn execute(config: &TrainerConfig, cmd: VersionsCommand) -> Result<()> {
    let registry = VersionRegistry::open(
        config.incremental.model_root.clone(),
        config.incremental.max_versions,
    )
    .context("failed to open version registry")?;

    match cmd {
        VersionsCommand::List { json } => list(&registry, json),
        VersionsCommand::History { json } => history(&registry, json),
    }
}

fn list(registry: &VersionRegistry, json: bool) -> Result<()> {
    let versions = registry.list_versions();

    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Model Versions ({})", versions.len()).bold().cyan());
    println!();

    if versions.is_empty() {
        println!("  {}", "No versions tracked for this model root.".dimmed());
        println!();
        return Ok(());
    }

    println!("{:<44} {:<24} {:<10} {}", "ID", "Range", "MAE", "Created");
    println!("{}", "─".repeat(100));
    for version in versions {
        let marker = if version.is_current { "*" } else { " " };
        println!(
            "{marker}{:<43} {:<24} {:<10.4} {}",
            version.version_id.cyan(),
            version.date_range.to_string(),
            version.performance.mae,
            version.created_at.to_rfc3339().dimmed()
        );
    }
    println!();
    Ok(())
}

fn history(registry: &VersionRegistry, json: bool) -> Result<()> {
    let history = registry.version_history();

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    println!();
    println!("{}", "Version History".bold().cyan());
    println!(
        "  Current:  {}",
        history.current_version.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Previous: {}",
        history.previous_version.as_deref().unwrap_or("(none)")
    );
    println!("  Tracked:  {}", history.total_versions);
    println!();
    Ok(())
}
