use crate::error::TrainingResult;
use meridian_data::PartitionKey;
use std::path::{Path, PathBuf};

/// Filesystem layout of a checkpoint root.
///
/// ```text
/// <root>/checkpoints/checkpoint_<YYYY>_<MM>.json   descriptor (one live)
/// <root>/checkpoints/latest.json                   pointer to the live descriptor
/// <root>/model_checkpoints/model_<YYYY>_<MM>.json  model snapshots
/// <root>/training_state.json                       cumulative run state
/// ```
#[derive(Debug, Clone)]
pub struct CheckpointLayout {
    root: PathBuf,
}

impl CheckpointLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn descriptors_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    #[must_use]
    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("model_checkpoints")
    }

    #[must_use]
    pub fn descriptor_path(&self, key: PartitionKey) -> PathBuf {
        self.descriptors_dir().join(format!("checkpoint_{}.json", key.file_stem()))
    }

    #[must_use]
    pub fn snapshot_path(&self, key: PartitionKey) -> PathBuf {
        self.snapshots_dir().join(format!("model_{}.json", key.file_stem()))
    }

    #[must_use]
    pub fn pointer_path(&self) -> PathBuf {
        self.descriptors_dir().join("latest.json")
    }

    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.root.join("training_state.json")
    }

    pub fn ensure_dirs(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(self.descriptors_dir())?;
        std::fs::create_dir_all(self.snapshots_dir())?;
        Ok(())
    }
}
