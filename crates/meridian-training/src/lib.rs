//! Meridian Training
//!
//! Resumable, checkpointed training orchestration:
//! - Single-slot checkpoint persistence (`CheckpointStore`)
//! - Remaining-work computation over partitions (`progress`)
//! - Bounded, restart-safe model versioning (`VersionRegistry`)
//! - The model capability seam (`Forecaster` / `ModelBackend`)
//! - The top-level orchestrator (`IncrementalTrainer`)

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod forecaster;
pub mod layout;
pub mod metrics;
pub mod progress;
pub mod state;
pub mod trainer;
pub mod versioning;

pub use checkpoint::{
    CheckpointRecord, CheckpointStore, LoadedCheckpoint, ProgressStatus, ProgressSummary,
};
pub use config::{DataConfig, IncrementalConfig, TrainerConfig};
pub use error::{TrainingError, TrainingResult};
pub use forecaster::{
    Device, ExecutionContext, Forecaster, ModelBackend, ModelConfig, SeasonalNaiveBackend,
    SeasonalNaiveModel, DEFAULT_SEASON_LENGTH,
};
pub use layout::CheckpointLayout;
pub use metrics::{evaluate_forecaster, PerformanceMetrics};
pub use progress::remaining_partitions;
pub use state::{ProcessedPartition, TrainingState};
pub use trainer::{IncrementalOutcome, IncrementalTrainer, RunReport, RunStatus, TrainingRequest};
pub use versioning::{
    compute_improvement, DateRange, RollbackOutcome, VersionHistory, VersionInfo, VersionListing,
    VersionManifest, VersionRegistry, VERSION_MANIFEST_FILE, VERSION_MODEL_FILE,
};
