use crate::error::{TrainingError, TrainingResult};
use crate::forecaster::{Forecaster, ModelBackend};
use crate::layout::CheckpointLayout;
use crate::state::TrainingState;
use chrono::{DateTime, Utc};
use meridian_data::{DataStats, PartitionKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Durable record written after one partition is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub key: PartitionKey,
    pub created_at: DateTime<Utc>,
    pub snapshot_path: PathBuf,
    pub snapshot_sha256: String,
    pub data_stats: DataStats,
    pub training_state: TrainingState,
    /// Descriptor file name, e.g. `checkpoint_2020_01.json`.
    pub name: String,
}

/// A checkpoint record plus the restored model, when its snapshot was still
/// readable. A record with `model: None` means the bookkeeping survived but
/// the model must be refitted from scratch.
pub struct LoadedCheckpoint {
    pub record: CheckpointRecord,
    pub model: Option<Box<dyn Forecaster>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
}

/// Read-only progress view derived from the persisted checkpoint slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub status: ProgressStatus,
    pub last_processed: Option<PartitionKey>,
    pub total_checkpoints: usize,
    pub last_checkpoint_time: Option<DateTime<Utc>>,
}

/// Points at the live descriptor so "most recent" never depends on
/// filesystem modification-time ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatestPointer {
    descriptor: String,
    updated_at: DateTime<Utc>,
}

/// Single-slot checkpoint persistence.
///
/// At most one descriptor is live at a time: `save` deletes the previous
/// descriptor before writing the next one. Snapshots of earlier partitions
/// are orphaned, not deleted. A descriptor is only written after the
/// snapshot it references is durably on disk.
pub struct CheckpointStore {
    layout: CheckpointLayout,
}

impl CheckpointStore {
    /// Open (and create, if needed) a checkpoint directory.
    pub fn open(root: impl Into<PathBuf>) -> TrainingResult<Self> {
        let layout = CheckpointLayout::new(root);
        layout.ensure_dirs()?;
        Ok(Self { layout })
    }

    #[must_use]
    pub fn layout(&self) -> &CheckpointLayout {
        &self.layout
    }

    /// Persist a checkpoint for `key`.
    ///
    /// Side effects in order: delete the previous descriptor, save the model
    /// snapshot, write the descriptor referencing it, update the latest
    /// pointer, overwrite the training-state file. Returns `false` on any
    /// failure; the caller must treat `false` as fatal for the run, because
    /// continuing would process partitions without a durable record.
    pub fn save(
        &self,
        key: PartitionKey,
        model: &dyn Forecaster,
        data_stats: &DataStats,
        training_state: &TrainingState,
    ) -> bool {
        match self.try_save(key, model, data_stats, training_state) {
            Ok(()) => {
                info!(partition = %key, "checkpoint saved");
                true
            }
            Err(e) => {
                error!(partition = %key, "failed to save checkpoint: {e}");
                false
            }
        }
    }

    fn try_save(
        &self,
        key: PartitionKey,
        model: &dyn Forecaster,
        data_stats: &DataStats,
        training_state: &TrainingState,
    ) -> TrainingResult<()> {
        self.layout.ensure_dirs()?;
        self.remove_descriptors();

        // Snapshot first; the descriptor must never reference a file that
        // was not durably written.
        let snapshot_path = self.layout.snapshot_path(key);
        model.save(&snapshot_path)?;
        let snapshot_sha256 = sha256_file(&snapshot_path)?;

        let name = format!("checkpoint_{}.json", key.file_stem());
        let record = CheckpointRecord {
            key,
            created_at: Utc::now(),
            snapshot_path,
            snapshot_sha256,
            data_stats: data_stats.clone(),
            training_state: training_state.clone(),
            name: name.clone(),
        };
        write_json_atomic(&self.layout.descriptor_path(key), &record)?;

        let pointer = LatestPointer { descriptor: name, updated_at: Utc::now() };
        write_json_atomic(&self.layout.pointer_path(), &pointer)?;

        self.store_training_state(training_state)?;
        Ok(())
    }

    /// Most recent checkpoint, or `None` if the slot is empty.
    ///
    /// The model snapshot is restored through `backend` when possible; a
    /// missing or unreadable snapshot still yields the record so progress
    /// bookkeeping survives, with `model: None`.
    #[must_use]
    pub fn load_last(&self, backend: &dyn ModelBackend) -> Option<LoadedCheckpoint> {
        let record = self.load_last_record()?;
        let model = self.restore_model(&record, backend);
        Some(LoadedCheckpoint { record, model })
    }

    /// Checkpoint for a specific partition, or `None`.
    #[must_use]
    pub fn load(&self, key: PartitionKey, backend: &dyn ModelBackend) -> Option<LoadedCheckpoint> {
        let record = read_record(&self.layout.descriptor_path(key))?;
        let model = self.restore_model(&record, backend);
        Some(LoadedCheckpoint { record, model })
    }

    /// Derived observability view; never fails.
    #[must_use]
    pub fn training_progress(&self) -> ProgressSummary {
        match self.load_last_record() {
            Some(record) => ProgressSummary {
                status: ProgressStatus::InProgress,
                last_processed: Some(record.key),
                total_checkpoints: self.descriptor_paths().len(),
                last_checkpoint_time: Some(record.created_at),
            },
            None => ProgressSummary {
                status: ProgressStatus::NotStarted,
                last_processed: None,
                total_checkpoints: 0,
                last_checkpoint_time: None,
            },
        }
    }

    /// Defensive cleanup: keep only the most recently modified descriptor.
    /// Referenced model snapshots are not touched.
    pub fn prune(&self) {
        let mut paths = self.descriptor_paths();
        if paths.len() <= 1 {
            return;
        }
        paths.sort_by_key(|p| modified_time(p));
        let keep = paths.pop();
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed stale checkpoint descriptor"),
                Err(e) => warn!(path = %path.display(), "failed to remove descriptor: {e}"),
            }
        }
        if let Some(keep) = keep {
            if let Some(name) = keep.file_name().and_then(|n| n.to_str()) {
                let pointer =
                    LatestPointer { descriptor: name.to_string(), updated_at: Utc::now() };
                if let Err(e) = write_json_atomic(&self.layout.pointer_path(), &pointer) {
                    warn!("failed to refresh latest pointer: {e}");
                }
            }
        }
    }

    /// Training state persisted at the fixed well-known path, if any.
    #[must_use]
    pub fn load_training_state(&self) -> Option<TrainingState> {
        let path = self.layout.state_path();
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(state) => Some(state),
                Err(e) => {
                    error!("failed to parse training state: {e}");
                    None
                }
            },
            Err(e) => {
                error!("failed to read training state: {e}");
                None
            }
        }
    }

    fn store_training_state(&self, state: &TrainingState) -> TrainingResult<()> {
        write_json_atomic(&self.layout.state_path(), state)
    }

    fn restore_model(
        &self,
        record: &CheckpointRecord,
        backend: &dyn ModelBackend,
    ) -> Option<Box<dyn Forecaster>> {
        if !record.snapshot_path.exists() {
            warn!(
                partition = %record.key,
                snapshot = %record.snapshot_path.display(),
                "checkpoint snapshot is missing, model must be refitted"
            );
            return None;
        }
        match backend.load(&record.snapshot_path) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(partition = %record.key, "failed to restore model snapshot: {e}");
                None
            }
        }
    }

    fn load_last_record(&self) -> Option<CheckpointRecord> {
        // Preferred path: the explicit pointer names the live descriptor.
        if let Some(pointer) = self.read_pointer() {
            let path = self.layout.descriptors_dir().join(&pointer.descriptor);
            if let Some(record) = read_record(&path) {
                return Some(record);
            }
            warn!(
                descriptor = %pointer.descriptor,
                "latest pointer is stale, falling back to directory scan"
            );
        }

        // Fallback: most recently modified descriptor wins.
        let mut paths = self.descriptor_paths();
        paths.sort_by_key(|p| modified_time(p));
        paths.into_iter().rev().find_map(|p| read_record(&p))
    }

    fn read_pointer(&self) -> Option<LatestPointer> {
        let path = self.layout.pointer_path();
        if !path.exists() {
            return None;
        }
        let json = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&json).ok()
    }

    fn descriptor_paths(&self) -> Vec<PathBuf> {
        let dir = self.layout.descriptors_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    error!("failed to list checkpoint descriptors: {e}");
                }
                return Vec::new();
            }
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("checkpoint_") && n.ends_with(".json"))
            })
            .collect()
    }

    fn remove_descriptors(&self) {
        for path in self.descriptor_paths() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), "failed to remove previous descriptor: {e}");
            }
        }
    }
}

fn read_record(path: &Path) -> Option<CheckpointRecord> {
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                error!(path = %path.display(), "failed to parse checkpoint descriptor: {e}");
                None
            }
        },
        Err(e) => {
            error!(path = %path.display(), "failed to read checkpoint descriptor: {e}");
            None
        }
    }
}

pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> TrainingResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| TrainingError::Checkpoint(format!("no parent for {}", path.display())))?;
    std::fs::create_dir_all(parent)?;

    let json = serde_json::to_string_pretty(value)?;
    let temp = path.with_extension("tmp");
    std::fs::write(&temp, json)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

fn sha256_file(path: &Path) -> TrainingResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

fn modified_time(path: &Path) -> std::time::SystemTime {
    path.metadata()
        .and_then(|m| m.modified())
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecaster::{
        ExecutionContext, ModelConfig, SeasonalNaiveBackend, SeasonalNaiveModel,
    };
    use chrono::NaiveDate;
    use meridian_data::{Observation, SeriesFrame};
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fitted_model() -> SeasonalNaiveModel {
        let frame = SeriesFrame::from_observations(
            (0..6)
                .map(|i| Observation {
                    series_id: "a".to_string(),
                    timestamp: chrono::DateTime::from_timestamp(i64::from(i) * 86_400, 0).unwrap(),
                    value: f64::from(i),
                })
                .collect(),
        );
        let mut model = SeasonalNaiveModel::new(3, ModelConfig::default());
        model.fit(&frame, &ExecutionContext::cpu()).unwrap();
        model
    }

    fn seed_state() -> TrainingState {
        TrainingState::new(
            date(2020, 1, 1),
            date(2020, 2, 28),
            date(2020, 3, 1),
            date(2020, 3, 31),
        )
    }

    fn save_for(store: &CheckpointStore, year: i32, month: u32) -> bool {
        let mut state = seed_state();
        state.record(
            PartitionKey::new(year, month),
            PathBuf::from(format!("{year:04}/{month:02}/a.jsonl")),
            6,
        );
        store.save(PartitionKey::new(year, month), &fitted_model(), &DataStats::default(), &state)
    }

    #[test]
    fn test_empty_store_has_no_checkpoint() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(store.load_last(&SeasonalNaiveBackend::default()).is_none());
        assert_eq!(store.training_progress().status, ProgressStatus::NotStarted);
    }

    #[test]
    fn test_save_then_load_last_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(save_for(&store, 2020, 1));

        let loaded = store.load_last(&SeasonalNaiveBackend::new(3)).unwrap();
        assert_eq!(loaded.record.key, PartitionKey::new(2020, 1));
        assert!(loaded.model.is_some());
        assert!(!loaded.record.snapshot_sha256.is_empty());

        let progress = store.training_progress();
        assert_eq!(progress.status, ProgressStatus::InProgress);
        assert_eq!(progress.last_processed, Some(PartitionKey::new(2020, 1)));
        assert_eq!(progress.total_checkpoints, 1);
    }

    #[test]
    fn test_at_most_one_live_descriptor() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(save_for(&store, 2020, 1));
        assert!(save_for(&store, 2020, 2));
        assert!(save_for(&store, 2020, 3));

        assert_eq!(store.descriptor_paths().len(), 1);
        let loaded = store.load_last(&SeasonalNaiveBackend::new(3)).unwrap();
        assert_eq!(loaded.record.key, PartitionKey::new(2020, 3));
    }

    #[test]
    fn test_missing_snapshot_still_yields_record() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(save_for(&store, 2020, 1));

        let snapshot = store.layout().snapshot_path(PartitionKey::new(2020, 1));
        std::fs::remove_file(snapshot).unwrap();

        let loaded = store.load_last(&SeasonalNaiveBackend::new(3)).unwrap();
        assert_eq!(loaded.record.key, PartitionKey::new(2020, 1));
        assert!(loaded.model.is_none());
    }

    #[test]
    fn test_load_last_survives_missing_pointer() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(save_for(&store, 2020, 1));

        std::fs::remove_file(store.layout().pointer_path()).unwrap();

        let loaded = store.load_last(&SeasonalNaiveBackend::new(3)).unwrap();
        assert_eq!(loaded.record.key, PartitionKey::new(2020, 1));
    }

    #[test]
    fn test_load_specific_partition() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(save_for(&store, 2020, 2));

        assert!(store.load(PartitionKey::new(2020, 2), &SeasonalNaiveBackend::new(3)).is_some());
        assert!(store.load(PartitionKey::new(2020, 1), &SeasonalNaiveBackend::new(3)).is_none());
    }

    #[test]
    fn test_training_state_persisted_at_fixed_path() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(save_for(&store, 2020, 1));

        let state = store.load_training_state().unwrap();
        assert!(state.is_processed(PartitionKey::new(2020, 1)));
        assert!(temp.path().join("training_state.json").exists());
    }

    #[test]
    fn test_prune_keeps_single_descriptor() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(save_for(&store, 2020, 1));

        // Simulate a stale descriptor left behind by an interrupted writer.
        let stale = store.layout().descriptors_dir().join("checkpoint_2019_12.json");
        let mut record =
            read_record(&store.layout().descriptor_path(PartitionKey::new(2020, 1))).unwrap();
        record.key = PartitionKey::new(2019, 12);
        std::fs::write(&stale, serde_json::to_string_pretty(&record).unwrap()).unwrap();
        assert_eq!(store.descriptor_paths().len(), 2);

        store.prune();
        assert_eq!(store.descriptor_paths().len(), 1);
    }
}
