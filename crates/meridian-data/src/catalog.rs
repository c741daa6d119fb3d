use crate::error::{DataError, DataResult};
use crate::partition::{months_in_range, PartitionFile, PartitionKey};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Enumerates partition files laid out as `<root>/<YYYY>/<MM>/*.jsonl`.
///
/// The catalog is read-only; it never creates directories and treats a
/// missing month directory as "no data for that month".
#[derive(Debug, Clone)]
pub struct PartitionCatalog {
    root: PathBuf,
}

impl PartitionCatalog {
    /// Open a catalog over an existing data root.
    pub fn new(root: impl Into<PathBuf>) -> DataResult<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(DataError::Catalog(format!(
                "data root does not exist: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All partition files whose month intersects the inclusive date range,
    /// in strictly chronological (year, month, file name) order.
    ///
    /// Fail-soft: any enumeration failure is logged and the whole call
    /// returns an empty result. Callers cannot distinguish "no data" from
    /// "enumeration failed"; both mean there is nothing to process.
    #[must_use]
    pub fn list_partitions(&self, start: NaiveDate, end: NaiveDate) -> Vec<PartitionFile> {
        match self.scan_range(start, end) {
            Ok(files) => {
                info!(
                    count = files.len(),
                    %start,
                    %end,
                    "discovered partition files"
                );
                files
            }
            Err(e) => {
                error!("failed to enumerate partitions: {e}");
                Vec::new()
            }
        }
    }

    fn scan_range(&self, start: NaiveDate, end: NaiveDate) -> DataResult<Vec<PartitionFile>> {
        let mut files = Vec::new();
        for key in months_in_range(start, end) {
            let month_dir = self.root.join(key.relative_dir());
            if !month_dir.exists() {
                debug!(partition = %key, "no directory for month, skipping");
                continue;
            }
            files.extend(self.scan_month(&month_dir, key)?);
        }
        Ok(files)
    }

    fn scan_month(&self, month_dir: &Path, key: PartitionKey) -> DataResult<Vec<PartitionFile>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(month_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                paths.push(path);
            }
        }
        // Multiple files within one month are ordered by name for determinism.
        paths.sort();
        Ok(paths.into_iter().map(|path| PartitionFile { path, key }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_month(root: &Path, year: i32, month: u32, names: &[&str]) {
        let dir = root.join(format!("{year:04}")).join(format!("{month:02}"));
        std::fs::create_dir_all(&dir).unwrap();
        for name in names {
            std::fs::write(dir.join(name), "{\"ds\": \"2020-01-01\", \"y\": 1.0}\n").unwrap();
        }
    }

    #[test]
    fn test_new_rejects_missing_root() {
        assert!(PartitionCatalog::new("/nonexistent/meridian-data-root").is_err());
    }

    #[test]
    fn test_list_partitions_is_chronological() {
        let temp = TempDir::new().unwrap();
        seed_month(temp.path(), 2020, 3, &["part.jsonl"]);
        seed_month(temp.path(), 2020, 1, &["part.jsonl"]);
        seed_month(temp.path(), 2020, 2, &["part.jsonl"]);

        let catalog = PartitionCatalog::new(temp.path()).unwrap();
        let files = catalog.list_partitions(date(2020, 1, 1), date(2020, 3, 31));

        let keys: Vec<_> = files.iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            vec![
                PartitionKey::new(2020, 1),
                PartitionKey::new(2020, 2),
                PartitionKey::new(2020, 3),
            ]
        );
    }

    #[test]
    fn test_missing_months_contribute_nothing() {
        let temp = TempDir::new().unwrap();
        seed_month(temp.path(), 2020, 1, &["part.jsonl"]);

        let catalog = PartitionCatalog::new(temp.path()).unwrap();
        let files = catalog.list_partitions(date(2020, 1, 1), date(2020, 3, 31));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key, PartitionKey::new(2020, 1));
    }

    #[test]
    fn test_files_within_month_sorted_by_name() {
        let temp = TempDir::new().unwrap();
        seed_month(temp.path(), 2020, 1, &["b.jsonl", "a.jsonl", "notes.txt"]);

        let catalog = PartitionCatalog::new(temp.path()).unwrap();
        let files = catalog.list_partitions(date(2020, 1, 1), date(2020, 1, 31));

        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.jsonl"]);
    }

    #[test]
    fn test_empty_range_returns_empty() {
        let temp = TempDir::new().unwrap();
        seed_month(temp.path(), 2020, 1, &["part.jsonl"]);
        let catalog = PartitionCatalog::new(temp.path()).unwrap();
        assert!(catalog.list_partitions(date(2021, 1, 1), date(2020, 1, 1)).is_empty());
    }
}
