use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Temporal identity of a unit of training data.
///
/// Partitions are keyed by calendar month. Multiple underlying files may map
/// to the same key; ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
}

impl PartitionKey {
    #[must_use]
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Key of the month containing the given date.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// Key of the following calendar month.
    #[must_use]
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Relative directory of this partition under a data root (`YYYY/MM`).
    #[must_use]
    pub fn relative_dir(self) -> PathBuf {
        PathBuf::from(format!("{:04}", self.year)).join(format!("{:02}", self.month))
    }

    /// Stable `YYYY_MM` fragment used in checkpoint and snapshot file names.
    #[must_use]
    pub fn file_stem(self) -> String {
        format!("{:04}_{:02}", self.year, self.month)
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A single partition file discovered under the data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFile {
    pub path: PathBuf,
    pub key: PartitionKey,
}

/// Every month key whose span intersects the inclusive `[start, end]` range,
/// in chronological order. Includes the months containing both endpoints.
#[must_use]
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<PartitionKey> {
    let mut months = Vec::new();
    if start > end {
        return months;
    }

    let last = PartitionKey::for_date(end);
    let mut current = PartitionKey::for_date(start);
    loop {
        months.push(current);
        if current == last {
            break;
        }
        current = current.next();
    }
    months
}
