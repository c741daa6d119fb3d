use crate::checkpoint::CheckpointStore;
use crate::config::TrainerConfig;
use crate::error::TrainingResult;
use crate::forecaster::{Forecaster, ModelBackend};
use crate::metrics::{evaluate_forecaster, PerformanceMetrics};
use crate::progress::remaining_partitions;
use crate::state::TrainingState;
use crate::versioning::{compute_improvement, DateRange, VersionRegistry, VERSION_MODEL_FILE};
use chrono::{NaiveDate, Utc};
use meridian_data::{read_partition, DataStats, FrameBuffer, PartitionCatalog, SeriesFrame};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Loaded history frames kept in memory between partition steps.
const HISTORY_BUFFER_CAPACITY: usize = 24;

/// Arguments for one checkpointed, resumable run.
#[derive(Debug, Clone)]
pub struct TrainingRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub validation_start_date: NaiveDate,
    pub validation_end_date: NaiveDate,
    pub checkpoint_dir: PathBuf,
    pub previous_model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Error,
    InProgress,
}

/// Structured result of every top-level orchestrator call. No errors escape
/// the orchestrator boundary; failures surface as `status: Error` reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub message: String,
    pub checkpoint_dir: Option<PathBuf>,
    pub final_model_path: Option<PathBuf>,
    pub performance: Option<PerformanceMetrics>,
    pub processed_partitions: usize,
    pub total_partitions: usize,
}

impl RunReport {
    fn error(message: impl Into<String>, checkpoint_dir: Option<PathBuf>) -> Self {
        Self {
            status: RunStatus::Error,
            message: message.into(),
            checkpoint_dir,
            final_model_path: None,
            performance: None,
            processed_partitions: 0,
            total_partitions: 0,
        }
    }
}

/// Result of the single-shot `train_incremental` path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalOutcome {
    pub success: bool,
    pub rolled_back: bool,
    pub version_id: String,
    pub model_location: Option<PathBuf>,
    pub date_range: DateRange,
    pub performance: PerformanceMetrics,
    pub performance_improvement: Option<f64>,
    pub previous_version: Option<String>,
    pub message: String,
}

/// Top-level orchestrator: drives the resume-or-start decision, processes
/// remaining partitions in chronological order, checkpoints after each one,
/// and versions the final model.
///
/// Fitting recombines the full processed history on every step rather than
/// updating incrementally; cost grows with history length. This is a known
/// scalability limit of the design, not an accident.
pub struct IncrementalTrainer {
    config: TrainerConfig,
    backend: Box<dyn ModelBackend>,
    registry: VersionRegistry,
    buffer: FrameBuffer,
}

impl IncrementalTrainer {
    pub fn new(config: TrainerConfig, backend: Box<dyn ModelBackend>) -> TrainingResult<Self> {
        let registry = VersionRegistry::open(
            config.incremental.model_root.clone(),
            config.incremental.max_versions,
        )?;
        Ok(Self { config, backend, registry, buffer: FrameBuffer::new(HISTORY_BUFFER_CAPACITY) })
    }

    #[must_use]
    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Resumable checkpointed training over `[start_date, end_date]`.
    pub fn train_with_checkpoints(&mut self, request: &TrainingRequest) -> RunReport {
        match self.run_checkpointed(request) {
            Ok(report) => report,
            Err(e) => {
                error!("resumable training failed: {e}");
                RunReport::error(
                    format!("resumable training failed: {e}"),
                    Some(request.checkpoint_dir.clone()),
                )
            }
        }
    }

    /// Resume a run from its persisted training state alone.
    pub fn resume_training(&mut self, checkpoint_dir: &Path) -> RunReport {
        let store = match CheckpointStore::open(checkpoint_dir) {
            Ok(store) => store,
            Err(e) => {
                return RunReport::error(
                    format!("cannot open checkpoint directory: {e}"),
                    Some(checkpoint_dir.to_path_buf()),
                )
            }
        };

        let Some(state) = store.load_training_state() else {
            return RunReport::error(
                "no training state found in checkpoint directory",
                Some(checkpoint_dir.to_path_buf()),
            );
        };

        self.train_with_checkpoints(&TrainingRequest {
            start_date: state.start_date,
            end_date: state.end_date,
            validation_start_date: state.validation_start_date,
            validation_end_date: state.validation_end_date,
            checkpoint_dir: checkpoint_dir.to_path_buf(),
            previous_model_path: None,
        })
    }

    fn run_checkpointed(&mut self, request: &TrainingRequest) -> TrainingResult<RunReport> {
        info!(
            start = %request.start_date,
            end = %request.end_date,
            checkpoint_dir = %request.checkpoint_dir.display(),
            "starting resumable training"
        );

        let store = CheckpointStore::open(&request.checkpoint_dir)?;

        // Resume from the last checkpoint when one exists; otherwise start
        // a fresh training state for the requested range.
        let (mut model, mut state) = match store.load_last(self.backend.as_ref()) {
            Some(loaded) => {
                info!(partition = %loaded.record.key, "resuming from checkpoint");
                (loaded.model, loaded.record.training_state)
            }
            None => {
                info!("no checkpoint found, starting fresh");
                (
                    None,
                    TrainingState::new(
                        request.start_date,
                        request.end_date,
                        request.validation_start_date,
                        request.validation_end_date,
                    ),
                )
            }
        };

        if model.is_none() {
            if let Some(path) = request.previous_model_path.as_deref() {
                model = self.load_prior_model(path);
            }
        }

        let catalog = PartitionCatalog::new(self.config.data_root()?)?;
        let all = catalog.list_partitions(request.start_date, request.end_date);
        let remaining = remaining_partitions(&all, Some(&state));
        state.total_partitions = all.len();

        if remaining.is_empty() {
            info!("no remaining partitions to process");
            return Ok(RunReport {
                status: RunStatus::Completed,
                message: "all partitions already processed".to_string(),
                checkpoint_dir: Some(request.checkpoint_dir.clone()),
                final_model_path: None,
                performance: None,
                processed_partitions: state.processed.len(),
                total_partitions: state.total_partitions,
            });
        }

        for file in &remaining {
            info!(partition = %file.key, path = %file.path.display(), "processing partition");

            // A partition that fails to load is skipped and stays
            // unprocessed, so the next resume retries it.
            let frame = match read_partition(&file.path) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(partition = %file.key, "skipping partition: {e}");
                    continue;
                }
            };

            let combined = self.recombine_history(&state, &frame);
            let mut fitted = self.backend.create(&self.config.model);
            if let Err(e) = fitted.fit(&combined, &self.config.execution) {
                // A fit failure aborts the run; the last checkpoint still
                // covers everything processed before this partition.
                error!(partition = %file.key, "model fit failed: {e}");
                return Ok(RunReport::error(
                    format!("model fit failed for {}: {e}", file.key),
                    Some(request.checkpoint_dir.clone()),
                ));
            }

            let stats = DataStats::describe(&frame);
            state.record(file.key, file.path.clone(), frame.record_count());

            if !store.save(file.key, fitted.as_ref(), &stats, &state) {
                // Continuing would process partitions without a durable
                // record of this one.
                return Ok(RunReport::error(
                    format!("failed to save checkpoint for {}", file.key),
                    Some(request.checkpoint_dir.clone()),
                ));
            }

            self.buffer.insert(file.path.display().to_string(), frame);
            model = Some(fitted);
        }

        info!("running final validation on held-out range");
        let performance = match model.as_deref() {
            Some(fitted) => {
                match self.load_range(
                    &catalog,
                    request.validation_start_date,
                    request.validation_end_date,
                ) {
                    Some(validation) => Some(evaluate_forecaster(
                        fitted,
                        &validation,
                        self.config.model.prediction_length,
                    )),
                    None => {
                        warn!("no validation data available, recording neutral metrics");
                        Some(PerformanceMetrics::neutral())
                    }
                }
            }
            None => None,
        };

        let final_model_path = model
            .as_deref()
            .and_then(|fitted| self.save_final_model(fitted, request.start_date, request.end_date));

        Ok(RunReport {
            status: RunStatus::Completed,
            message: "resumable training completed".to_string(),
            checkpoint_dir: Some(request.checkpoint_dir.clone()),
            final_model_path,
            performance,
            processed_partitions: state.processed.len(),
            total_partitions: state.total_partitions,
        })
    }

    /// One-shot, non-checkpointed training over a full range.
    pub fn train_full(
        &mut self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        model_path: Option<&Path>,
    ) -> RunReport {
        match self.run_full(start_date, end_date, model_path) {
            Ok(report) => report,
            Err(e) => {
                error!("training failed: {e}");
                RunReport::error(format!("training failed: {e}"), None)
            }
        }
    }

    fn run_full(
        &mut self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        model_path: Option<&Path>,
    ) -> TrainingResult<RunReport> {
        let catalog = PartitionCatalog::new(self.config.data_root()?)?;
        let files = catalog.list_partitions(start_date, end_date);
        if files.is_empty() {
            return Ok(RunReport::error(
                format!("no data found for {start_date} to {end_date}"),
                None,
            ));
        }

        let mut frames = Vec::new();
        for file in &files {
            match read_partition(&file.path) {
                Ok(frame) => frames.push(frame),
                Err(e) => warn!(partition = %file.key, "skipping partition: {e}"),
            }
        }
        if frames.is_empty() {
            return Ok(RunReport::error(
                format!("no loadable data files for {start_date} to {end_date}"),
                None,
            ));
        }

        let total = files.len();
        let loaded = frames.len();
        let combined = SeriesFrame::concat(&frames);
        info!(records = combined.record_count(), "fitting on full range");

        let mut model = self.backend.create(&self.config.model);
        model.fit(&combined, &self.config.execution)?;
        let performance =
            evaluate_forecaster(model.as_ref(), &combined, self.config.model.prediction_length);

        let final_model_path = match model_path {
            Some(path) => {
                model.save(path)?;
                Some(path.to_path_buf())
            }
            None => self.save_final_model(model.as_ref(), start_date, end_date),
        };

        Ok(RunReport {
            status: RunStatus::Completed,
            message: "training completed".to_string(),
            checkpoint_dir: None,
            final_model_path,
            performance: Some(performance),
            processed_partitions: loaded,
            total_partitions: total,
        })
    }

    /// Single-shot incremental step for callers that already hold the data:
    /// fit, evaluate, compare against the prior version, and either commit a
    /// new version or roll back.
    pub fn train_incremental(
        &mut self,
        data: &SeriesFrame,
        range: DateRange,
        previous_model_path: Option<&Path>,
    ) -> TrainingResult<IncrementalOutcome> {
        info!(range = %range, "starting incremental training");

        let version_id = self.registry.generate_version_id(range);
        info!(version = %version_id, "creating new model version");

        let mut model = self.backend.create(&self.config.model);
        let mut previous_performance = None;
        if let Some(path) = previous_model_path {
            if let Some(prior) = self.load_prior_model(path) {
                model = prior;
                previous_performance = Some(self.registry.previous_performance(path));
            }
        }

        model.fit(data, &self.config.execution)?;
        let performance =
            evaluate_forecaster(model.as_ref(), data, self.config.model.prediction_length);

        let mut improvement = None;
        if let Some(previous) = previous_performance {
            let measured = compute_improvement(&performance, &previous);
            improvement = Some(measured);

            if measured < self.config.incremental.performance_threshold {
                warn!(
                    improvement = measured,
                    threshold = self.config.incremental.performance_threshold,
                    "improvement below threshold"
                );
                if self.config.incremental.rollback_enabled {
                    let outcome = self.registry.rollback(&version_id);
                    return Ok(IncrementalOutcome {
                        success: false,
                        rolled_back: true,
                        version_id,
                        model_location: None,
                        date_range: range,
                        performance,
                        performance_improvement: improvement,
                        previous_version: outcome.current_version,
                        message: outcome.message,
                    });
                }
                warn!("rollback disabled, keeping new model despite poor performance");
            }
        }

        // Stage the snapshot, then let the registry move it into place.
        let staging = self
            .config
            .incremental
            .model_root
            .join(format!("staging_{version_id}.json"));
        model.save(&staging)?;

        let location = self.registry.save_version(
            &staging,
            &version_id,
            range,
            &performance,
            &self.config.model,
            &self.config.covariates,
        )?;
        self.registry.update_tracking(&version_id, location.clone(), range, &performance);
        self.registry.cleanup();

        info!(version = %version_id, location = %location.display(), "incremental training completed");
        Ok(IncrementalOutcome {
            success: true,
            rolled_back: false,
            version_id,
            model_location: Some(location),
            date_range: range,
            performance,
            performance_improvement: improvement,
            previous_version: self.registry.previous_version().map(str::to_string),
            message: "incremental training completed".to_string(),
        })
    }

    fn load_prior_model(&self, path: &Path) -> Option<Box<dyn Forecaster>> {
        let snapshot = if path.is_dir() { path.join(VERSION_MODEL_FILE) } else { path.to_path_buf() };
        if !snapshot.exists() {
            warn!(path = %snapshot.display(), "previous model not found, starting fresh");
            return None;
        }
        match self.backend.load(&snapshot) {
            Ok(model) => {
                info!(path = %snapshot.display(), "loaded previous model");
                Some(model)
            }
            Err(e) => {
                warn!(path = %snapshot.display(), "failed to load previous model: {e}, starting fresh");
                None
            }
        }
    }

    /// Concatenation of every previously processed partition plus `current`.
    fn recombine_history(&mut self, state: &TrainingState, current: &SeriesFrame) -> SeriesFrame {
        let mut frames = Vec::with_capacity(state.processed.len() + 1);
        for processed in &state.processed {
            let cache_key = processed.source.display().to_string();
            if let Some(frame) = self.buffer.get(&cache_key) {
                frames.push(frame.clone());
                continue;
            }
            match read_partition(&processed.source) {
                Ok(frame) => {
                    self.buffer.insert(cache_key, frame.clone());
                    frames.push(frame);
                }
                Err(e) => {
                    warn!(
                        source = %processed.source.display(),
                        "could not reload processed partition for history: {e}"
                    );
                }
            }
        }
        frames.push(current.clone());
        SeriesFrame::concat(&frames)
    }

    fn load_range(
        &self,
        catalog: &PartitionCatalog,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<SeriesFrame> {
        let files = catalog.list_partitions(start, end);
        if files.is_empty() {
            return None;
        }
        let frames: Vec<SeriesFrame> = files
            .iter()
            .filter_map(|file| match read_partition(&file.path) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!(partition = %file.key, "skipping validation partition: {e}");
                    None
                }
            })
            .collect();
        if frames.is_empty() {
            return None;
        }
        Some(SeriesFrame::concat(&frames))
    }

    fn save_final_model(
        &self,
        model: &dyn Forecaster,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Option<PathBuf> {
        let name = format!(
            "model_{}_{}_{}.json",
            start_date.format("%Y%m%d"),
            end_date.format("%Y%m%d"),
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.config.incremental.model_root.join(name);
        match model.save(&path) {
            Ok(()) => {
                info!(path = %path.display(), "final model saved");
                Some(path)
            }
            Err(e) => {
                error!("failed to save final model: {e}");
                None
            }
        }
    }
}
