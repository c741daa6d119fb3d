use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Utc};
use meridian_data::SeriesFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Compute device requested for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Auto,
    Cpu,
    Cuda,
    Metal,
}

impl Default for Device {
    fn default() -> Self {
        Self::Auto
    }
}

/// Execution settings handed to the fitting capability.
///
/// Passed explicitly into `fit` so backends never have to reach for
/// process-wide environment state to pick a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub threads: Option<usize>,
}

impl ExecutionContext {
    #[must_use]
    pub fn cpu() -> Self {
        Self { device: Device::Cpu, threads: None }
    }
}

/// Hyperparameters recorded alongside every saved version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub prediction_length: usize,
    pub context_length: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            prediction_length: 12,
            context_length: 64,
            learning_rate: 1e-4,
            batch_size: 32,
            max_epochs: 2,
        }
    }
}

/// The model capability the orchestrator depends on.
///
/// Implementations are synchronous; a `fit` call may block for a long time
/// and the orchestrator checkpoints only between partitions.
pub trait Forecaster {
    /// Fit (or refit) on the given data.
    fn fit(&mut self, data: &SeriesFrame, ctx: &ExecutionContext) -> TrainingResult<()>;

    /// Forecast `horizon` points following the end of `history`.
    fn predict(&self, history: &SeriesFrame, horizon: usize) -> TrainingResult<Vec<f64>>;

    /// Persist a snapshot of the trained state to `path`.
    fn save(&self, path: &Path) -> TrainingResult<()>;
}

/// Creates and restores forecasters; snapshot formats live behind this seam.
pub trait ModelBackend {
    fn id(&self) -> &'static str;

    fn create(&self, config: &ModelConfig) -> Box<dyn Forecaster>;

    fn load(&self, path: &Path) -> TrainingResult<Box<dyn Forecaster>>;
}

/// Default seasonal period (monthly data, yearly seasonality).
pub const DEFAULT_SEASON_LENGTH: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeasonalNaiveSnapshot {
    backend: String,
    season_length: usize,
    config: ModelConfig,
    history: Vec<f64>,
    fitted_records: usize,
    saved_at: DateTime<Utc>,
}

/// Deterministic per-frame seasonal-naive forecaster.
///
/// Each forecast point repeats the observation one season earlier; with less
/// than one season of history it repeats the last observed value. This is the
/// in-tree reference implementation of the capability seam, not a
/// statistically serious model.
#[derive(Debug, Clone)]
pub struct SeasonalNaiveModel {
    season_length: usize,
    config: ModelConfig,
    history: Vec<f64>,
    fitted_records: usize,
}

impl SeasonalNaiveModel {
    #[must_use]
    pub fn new(season_length: usize, config: ModelConfig) -> Self {
        Self {
            season_length: season_length.max(1),
            config,
            history: Vec::new(),
            fitted_records: 0,
        }
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted_records > 0
    }

    fn forecast_from(&self, history: &[f64], horizon: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(horizon);
        if history.is_empty() {
            out.resize(horizon, 0.0);
            return out;
        }
        for step in 0..horizon {
            let value = if history.len() >= self.season_length {
                let base = history.len() - self.season_length;
                history[base + (step % self.season_length)]
            } else {
                *history.last().unwrap_or(&0.0)
            };
            out.push(value);
        }
        out
    }
}

impl Forecaster for SeasonalNaiveModel {
    fn fit(&mut self, data: &SeriesFrame, ctx: &ExecutionContext) -> TrainingResult<()> {
        if data.is_empty() {
            return Err(TrainingError::Fit("fit called with an empty frame".to_string()));
        }
        debug!(device = ?ctx.device, records = data.record_count(), "fitting seasonal-naive model");

        let values = data.values();
        let keep = self.config.context_length.max(self.season_length);
        let start = values.len().saturating_sub(keep);
        self.history = values[start..].to_vec();
        self.fitted_records = data.record_count();
        Ok(())
    }

    fn predict(&self, history: &SeriesFrame, horizon: usize) -> TrainingResult<Vec<f64>> {
        if !self.is_fitted() {
            return Err(TrainingError::Fit("predict called before fit".to_string()));
        }
        let values = history.values();
        let source = if values.is_empty() { &self.history } else { &values };
        Ok(self.forecast_from(source, horizon))
    }

    fn save(&self, path: &Path) -> TrainingResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = SeasonalNaiveSnapshot {
            backend: "seasonal-naive".to_string(),
            season_length: self.season_length,
            config: self.config.clone(),
            history: self.history.clone(),
            fitted_records: self.fitted_records,
            saved_at: Utc::now(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }
}

/// Backend for [`SeasonalNaiveModel`] snapshots.
#[derive(Debug, Clone)]
pub struct SeasonalNaiveBackend {
    season_length: usize,
}

impl SeasonalNaiveBackend {
    #[must_use]
    pub fn new(season_length: usize) -> Self {
        Self { season_length: season_length.max(1) }
    }
}

impl Default for SeasonalNaiveBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SEASON_LENGTH)
    }
}

impl ModelBackend for SeasonalNaiveBackend {
    fn id(&self) -> &'static str {
        "seasonal-naive"
    }

    fn create(&self, config: &ModelConfig) -> Box<dyn Forecaster> {
        Box::new(SeasonalNaiveModel::new(self.season_length, config.clone()))
    }

    fn load(&self, path: &Path) -> TrainingResult<Box<dyn Forecaster>> {
        let bytes = std::fs::read(path)?;
        let snapshot: SeasonalNaiveSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.backend != "seasonal-naive" {
            return Err(TrainingError::Fit(format!(
                "snapshot at {} was written by backend {:?}",
                path.display(),
                snapshot.backend
            )));
        }
        Ok(Box::new(SeasonalNaiveModel {
            season_length: snapshot.season_length.max(1),
            config: snapshot.config,
            history: snapshot.history,
            fitted_records: snapshot.fitted_records.max(1),
        }))
    }
}
