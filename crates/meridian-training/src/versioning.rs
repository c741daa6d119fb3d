use crate::checkpoint::write_json_atomic;
use crate::error::TrainingResult;
use crate::forecaster::ModelConfig;
use crate::metrics::PerformanceMetrics;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// File name of the model payload inside a version directory.
pub const VERSION_MODEL_FILE: &str = "model.json";
/// File name of the metadata descriptor inside a version directory.
pub const VERSION_MANIFEST_FILE: &str = "version_manifest.json";

/// Inclusive calendar date range a version was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Metadata descriptor persisted beside every version's model payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub version_id: String,
    pub date_range: DateRange,
    pub performance: PerformanceMetrics,
    pub model_config: ModelConfig,
    #[serde(default)]
    pub covariate_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// One tracked version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version_id: String,
    pub location: PathBuf,
    pub date_range: DateRange,
    pub performance: PerformanceMetrics,
    pub created_at: DateTime<Utc>,
}

/// Listing entry for user-facing views, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionListing {
    pub version_id: String,
    pub date_range: DateRange,
    pub performance: PerformanceMetrics,
    pub created_at: DateTime<Utc>,
    pub is_current: bool,
}

/// Complete history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionHistory {
    pub current_version: Option<String>,
    pub previous_version: Option<String>,
    pub versions: Vec<VersionInfo>,
    pub total_versions: usize,
}

/// Result of rolling back a version whose performance fell short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackOutcome {
    pub success: bool,
    pub rolled_back: bool,
    pub current_version: Option<String>,
    pub failed_version: String,
    pub message: String,
}

/// Fractional reduction of the primary error metric relative to the prior
/// version, floored at zero. A regression reports 0.0, not a negative value,
/// so callers cannot distinguish "no change" from "got worse" here.
#[must_use]
pub fn compute_improvement(current: &PerformanceMetrics, previous: &PerformanceMetrics) -> f64 {
    if previous.mae == 0.0 {
        return 0.0;
    }
    ((previous.mae - current.mae) / previous.mae).max(0.0)
}

/// Assigns identifiers to trained-model snapshots, persists per-version
/// metadata, and bounds the retained set.
///
/// Tracking state is rebuilt from the on-disk manifests at `open`, so the
/// history view is complete across process restarts.
pub struct VersionRegistry {
    root: PathBuf,
    max_versions: usize,
    versions: Vec<VersionInfo>,
    current_version: Option<String>,
    previous_version: Option<String>,
}

impl VersionRegistry {
    /// Open a registry root, creating it if needed and reloading any
    /// versions already persisted beneath it.
    pub fn open(root: impl Into<PathBuf>, max_versions: usize) -> TrainingResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let mut versions = Self::scan(&root);
        versions.sort_by_key(|v| v.created_at);

        let current_version = versions.last().map(|v| v.version_id.clone());
        let previous_version = versions
            .len()
            .checked_sub(2)
            .map(|idx| versions[idx].version_id.clone());

        info!(
            root = %root.display(),
            tracked = versions.len(),
            "opened version registry"
        );
        Ok(Self { root, max_versions: max_versions.max(1), versions, current_version, previous_version })
    }

    fn scan(root: &Path) -> Vec<VersionInfo> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut versions = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let manifest_path = dir.join(VERSION_MANIFEST_FILE);
            if !manifest_path.exists() {
                continue;
            }
            match read_manifest(&manifest_path) {
                Ok(manifest) => versions.push(VersionInfo {
                    version_id: manifest.version_id,
                    location: dir,
                    date_range: manifest.date_range,
                    performance: manifest.performance,
                    created_at: manifest.created_at,
                }),
                Err(e) => warn!(path = %manifest_path.display(), "skipping unreadable manifest: {e}"),
            }
        }
        versions
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn current_version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }

    #[must_use]
    pub fn previous_version(&self) -> Option<&str> {
        self.previous_version.as_deref()
    }

    /// Identifier combining the trained date range with a creation
    /// timestamp. Collisions require two versions of the same range within
    /// the same wall-clock second.
    #[must_use]
    pub fn generate_version_id(&self, range: DateRange) -> String {
        format!(
            "model_{}_{}_{}",
            range.start.format("%Y%m%d"),
            range.end.format("%Y%m%d"),
            Utc::now().format("%Y%m%d_%H%M%S")
        )
    }

    #[must_use]
    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.root.join(version_id)
    }

    /// Move a transient model snapshot into the version directory and write
    /// the metadata descriptor beside it.
    ///
    /// A missing snapshot source is a data-integrity gap: metadata is still
    /// written (and logged) but the version carries no loadable payload.
    pub fn save_version(
        &self,
        snapshot_source: &Path,
        version_id: &str,
        range: DateRange,
        performance: &PerformanceMetrics,
        model_config: &ModelConfig,
        covariate_config: &serde_json::Value,
    ) -> TrainingResult<PathBuf> {
        let version_dir = self.version_dir(version_id);
        std::fs::create_dir_all(&version_dir)?;

        if snapshot_source.exists() {
            let destination = version_dir.join(VERSION_MODEL_FILE);
            move_file(snapshot_source, &destination)?;
        } else {
            warn!(
                source = %snapshot_source.display(),
                version = version_id,
                "snapshot source missing, saving metadata without model payload"
            );
        }

        let manifest = VersionManifest {
            version_id: version_id.to_string(),
            date_range: range,
            performance: performance.clone(),
            model_config: model_config.clone(),
            covariate_config: covariate_config.clone(),
            created_at: Utc::now(),
        };
        write_json_atomic(&version_dir.join(VERSION_MANIFEST_FILE), &manifest)?;

        info!(version = version_id, dir = %version_dir.display(), "version saved");
        Ok(version_dir)
    }

    /// Rotate the current pointer to `version_id` and record its info.
    pub fn update_tracking(
        &mut self,
        version_id: &str,
        location: PathBuf,
        range: DateRange,
        performance: &PerformanceMetrics,
    ) {
        self.previous_version = self.current_version.take();
        self.current_version = Some(version_id.to_string());
        self.versions.push(VersionInfo {
            version_id: version_id.to_string(),
            location,
            date_range: range,
            performance: performance.clone(),
            created_at: Utc::now(),
        });
    }

    /// Performance recorded for a previously saved version, read from its
    /// manifest; assumed baseline scores when the manifest is unreadable.
    #[must_use]
    pub fn previous_performance(&self, version_location: &Path) -> PerformanceMetrics {
        let manifest_path = version_location.join(VERSION_MANIFEST_FILE);
        match read_manifest(&manifest_path) {
            Ok(manifest) => manifest.performance,
            Err(e) => {
                warn!(
                    path = %manifest_path.display(),
                    "could not read prior performance, assuming baseline: {e}"
                );
                PerformanceMetrics::assumed_prior()
            }
        }
    }

    /// Evict the oldest versions (by creation time) until the retained set
    /// fits `max_versions`. Failures are logged, never raised; eviction is
    /// secondary bookkeeping.
    pub fn cleanup(&mut self) {
        while self.versions.len() > self.max_versions {
            let oldest = self
                .versions
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.created_at)
                .map(|(idx, _)| idx);
            let Some(idx) = oldest else { break };
            let evicted = self.versions.remove(idx);

            if let Err(e) = std::fs::remove_dir_all(&evicted.location) {
                warn!(
                    version = %evicted.version_id,
                    dir = %evicted.location.display(),
                    "failed to remove evicted version directory: {e}"
                );
            } else {
                info!(version = %evicted.version_id, "evicted old version");
            }
        }
    }

    /// Drop the failed version from tracking and restore the previous
    /// current pointer. On-disk artifacts of the failed version are left in
    /// place; only bookkeeping is rolled back.
    pub fn rollback(&mut self, failed_version_id: &str) -> RollbackOutcome {
        info!(version = failed_version_id, "rolling back failed version");
        self.versions.retain(|v| v.version_id != failed_version_id);

        if self.current_version.as_deref() == Some(failed_version_id) {
            self.current_version = self.previous_version.clone();
        }

        RollbackOutcome {
            success: false,
            rolled_back: true,
            current_version: self.current_version.clone(),
            failed_version: failed_version_id.to_string(),
            message: "performance below threshold, rolled back to previous version".to_string(),
        }
    }

    /// All tracked versions, newest first.
    #[must_use]
    pub fn list_versions(&self) -> Vec<VersionListing> {
        let mut listings: Vec<VersionListing> = self
            .versions
            .iter()
            .map(|v| VersionListing {
                version_id: v.version_id.clone(),
                date_range: v.date_range,
                performance: v.performance.clone(),
                created_at: v.created_at,
                is_current: self.current_version.as_deref() == Some(v.version_id.as_str()),
            })
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listings
    }

    #[must_use]
    pub fn version_history(&self) -> VersionHistory {
        VersionHistory {
            current_version: self.current_version.clone(),
            previous_version: self.previous_version.clone(),
            versions: self.versions.clone(),
            total_versions: self.versions.len(),
        }
    }

    /// Point the current version at an already-tracked version.
    pub fn switch_to(&mut self, version_id: &str) -> bool {
        if !self.versions.iter().any(|v| v.version_id == version_id) {
            error!(version = version_id, "cannot switch to unknown version");
            return false;
        }
        self.previous_version = self.current_version.take();
        self.current_version = Some(version_id.to_string());
        info!(version = version_id, "switched current version");
        true
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.versions.len()
    }
}

fn read_manifest(path: &Path) -> TrainingResult<VersionManifest> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn move_file(source: &Path, destination: &Path) -> TrainingResult<()> {
    if std::fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    // Rename fails across filesystems; fall back to copy + remove.
    std::fs::copy(source, destination)?;
    std::fs::remove_file(source)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn range(start_month: u32) -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2020, start_month, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, start_month, 28).unwrap(),
        }
    }

    fn metrics(mae: f64) -> PerformanceMetrics {
        PerformanceMetrics { mae, rmse: mae, mase: 1.0, directional_accuracy: 0.5 }
    }

    fn save_tracked(registry: &mut VersionRegistry, temp: &TempDir, id: &str, month: u32) {
        let snapshot = temp.path().join(format!("snapshot_{id}.json"));
        std::fs::write(&snapshot, "{}").unwrap();
        let location = registry
            .save_version(
                &snapshot,
                id,
                range(month),
                &metrics(1.0),
                &ModelConfig::default(),
                &serde_json::Value::Null,
            )
            .unwrap();
        registry.update_tracking(id, location, range(month), &metrics(1.0));
    }

    #[test]
    fn test_improvement_is_clamped_at_zero() {
        // Current error 2.0 against previous 1.0 is a regression: report 0.0.
        assert_eq!(compute_improvement(&metrics(2.0), &metrics(1.0)), 0.0);
        assert!((compute_improvement(&metrics(0.5), &metrics(1.0)) - 0.5).abs() < 1e-12);
        assert_eq!(compute_improvement(&metrics(1.0), &metrics(0.0)), 0.0);
    }

    #[test]
    fn test_version_id_embeds_date_range() {
        let temp = TempDir::new().unwrap();
        let registry = VersionRegistry::open(temp.path(), 10).unwrap();
        let id = registry.generate_version_id(range(1));
        assert!(id.starts_with("model_20200101_20200128_"));
    }

    #[test]
    fn test_save_version_moves_snapshot_and_writes_manifest() {
        let temp = TempDir::new().unwrap();
        let mut registry = VersionRegistry::open(temp.path().join("versions"), 10).unwrap();
        save_tracked(&mut registry, &temp, "v1", 1);

        let dir = registry.version_dir("v1");
        assert!(dir.join(VERSION_MODEL_FILE).exists());
        assert!(dir.join(VERSION_MANIFEST_FILE).exists());
        assert!(!temp.path().join("snapshot_v1.json").exists());
        assert_eq!(registry.current_version(), Some("v1"));
    }

    #[test]
    fn test_save_version_without_source_still_writes_manifest() {
        let temp = TempDir::new().unwrap();
        let registry = VersionRegistry::open(temp.path().join("versions"), 10).unwrap();
        let dir = registry
            .save_version(
                Path::new("/nonexistent/snapshot.json"),
                "v1",
                range(1),
                &metrics(1.0),
                &ModelConfig::default(),
                &serde_json::Value::Null,
            )
            .unwrap();
        assert!(dir.join(VERSION_MANIFEST_FILE).exists());
        assert!(!dir.join(VERSION_MODEL_FILE).exists());
    }

    #[test]
    fn test_cleanup_evicts_oldest_beyond_bound() {
        let temp = TempDir::new().unwrap();
        let mut registry = VersionRegistry::open(temp.path().join("versions"), 2).unwrap();
        for (idx, id) in ["v1", "v2", "v3", "v4"].iter().enumerate() {
            save_tracked(&mut registry, &temp, id, idx as u32 + 1);
        }

        registry.cleanup();
        assert_eq!(registry.tracked_count(), 2);
        let ids: Vec<_> = registry.list_versions().into_iter().map(|v| v.version_id).collect();
        assert_eq!(ids, vec!["v4", "v3"]);
        assert!(!registry.version_dir("v1").exists());
        assert!(!registry.version_dir("v2").exists());
        assert!(registry.version_dir("v3").exists());
    }

    #[test]
    fn test_rollback_restores_previous_pointer_and_keeps_artifacts() {
        let temp = TempDir::new().unwrap();
        let mut registry = VersionRegistry::open(temp.path().join("versions"), 10).unwrap();
        save_tracked(&mut registry, &temp, "v1", 1);
        save_tracked(&mut registry, &temp, "v2", 2);

        let outcome = registry.rollback("v2");
        assert!(!outcome.success);
        assert!(outcome.rolled_back);
        assert_eq!(outcome.current_version.as_deref(), Some("v1"));
        assert_eq!(registry.current_version(), Some("v1"));
        assert_eq!(registry.tracked_count(), 1);
        // On-disk artifacts of the failed version are intentionally left.
        assert!(registry.version_dir("v2").exists());
    }

    #[test]
    fn test_history_rebuilt_from_disk() {
        let temp = TempDir::new().unwrap();
        let versions_root = temp.path().join("versions");
        {
            let mut registry = VersionRegistry::open(&versions_root, 10).unwrap();
            save_tracked(&mut registry, &temp, "v1", 1);
            save_tracked(&mut registry, &temp, "v2", 2);
        }

        let reopened = VersionRegistry::open(&versions_root, 10).unwrap();
        assert_eq!(reopened.tracked_count(), 2);
        assert_eq!(reopened.current_version(), Some("v2"));
        assert_eq!(reopened.previous_version(), Some("v1"));
    }

    #[test]
    fn test_switch_to_unknown_version_fails() {
        let temp = TempDir::new().unwrap();
        let mut registry = VersionRegistry::open(temp.path().join("versions"), 10).unwrap();
        assert!(!registry.switch_to("missing"));

        save_tracked(&mut registry, &temp, "v1", 1);
        save_tracked(&mut registry, &temp, "v2", 2);
        assert!(registry.switch_to("v1"));
        assert_eq!(registry.current_version(), Some("v1"));
        assert_eq!(registry.previous_version(), Some("v2"));
    }

    #[test]
    fn test_previous_performance_falls_back_to_baseline() {
        let temp = TempDir::new().unwrap();
        let registry = VersionRegistry::open(temp.path().join("versions"), 10).unwrap();
        let scores = registry.previous_performance(Path::new("/nonexistent/version"));
        assert_eq!(scores, PerformanceMetrics::assumed_prior());
    }
}
