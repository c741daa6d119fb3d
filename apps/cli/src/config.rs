//! CLI configuration loading.

use anyhow::{Context, Result};
use meridian_training::TrainerConfig;
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "meridian.toml";

/// Load trainer configuration.
///
/// An explicitly passed `--config` path must exist and parse; otherwise
/// `./meridian.toml` is used when present, and built-in defaults when not.
/// Commands that need required settings (the data root, a checkpoint
/// directory) fail fast when those are absent from the result.
pub fn load(path: Option<&Path>) -> Result<TrainerConfig> {
    if let Some(path) = path {
        return TrainerConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    if default.exists() {
        info!(path = DEFAULT_CONFIG_PATH, "using default configuration file");
        return TrainerConfig::load_from_file(default)
            .with_context(|| format!("failed to load configuration from {DEFAULT_CONFIG_PATH}"));
    }

    warn!("no configuration file found, using built-in defaults");
    Ok(TrainerConfig::default())
}
