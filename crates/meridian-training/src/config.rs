use crate::error::{TrainingError, TrainingResult};
use crate::forecaster::{ExecutionContext, ModelConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Trainer configuration, loaded from a TOML file (`meridian.toml`).
///
/// Every section is optional in the file; required values (the data root,
/// and the checkpoint directory for checkpointed runs) are validated
/// fail-fast through the accessor methods before any training work starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub incremental: IncrementalConfig,

    #[serde(default)]
    pub execution: ExecutionContext,

    /// Free-form covariate settings, recorded verbatim in version manifests.
    #[serde(default)]
    pub covariates: serde_json::Value,
}

/// Data source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory containing `YYYY/MM/` partition subdirectories.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Incremental training settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalConfig {
    /// Root directory for versioned models.
    #[serde(default = "default_model_root")]
    pub model_root: PathBuf,

    /// Checkpoint directory for resumable runs.
    #[serde(default)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Minimum fractional improvement a new version must show.
    #[serde(default = "default_performance_threshold")]
    pub performance_threshold: f64,

    /// Roll back a version whose improvement falls below the threshold.
    #[serde(default = "default_rollback_enabled")]
    pub rollback_enabled: bool,

    /// Retention bound for the version registry.
    #[serde(default = "default_max_versions")]
    pub max_versions: usize,
}

fn default_model_root() -> PathBuf {
    PathBuf::from("data/models/incremental")
}

fn default_performance_threshold() -> f64 {
    0.05
}

fn default_rollback_enabled() -> bool {
    true
}

fn default_max_versions() -> usize {
    10
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            model_root: default_model_root(),
            checkpoint_dir: None,
            performance_threshold: default_performance_threshold(),
            rollback_enabled: default_rollback_enabled(),
            max_versions: default_max_versions(),
        }
    }
}

impl TrainerConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> TrainingResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TrainingError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents)
            .map_err(|e| TrainingError::Config(format!("invalid TOML in {}: {e}", path.display())))
    }

    /// The configured data root. Missing configuration fails fast here,
    /// before a run gets anywhere near the data.
    pub fn data_root(&self) -> TrainingResult<&Path> {
        match self.data.root.as_deref() {
            Some(root) if !root.as_os_str().is_empty() => Ok(root),
            _ => Err(TrainingError::Config(
                "data root is not configured (set [data] root in meridian.toml)".to_string(),
            )),
        }
    }

    /// The configured checkpoint directory for resumable runs.
    pub fn checkpoint_dir(&self) -> TrainingResult<&Path> {
        match self.incremental.checkpoint_dir.as_deref() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
            _ => Err(TrainingError::Config(
                "checkpoint directory is not configured (set [incremental] checkpoint_dir)"
                    .to_string(),
            )),
        }
    }
}
