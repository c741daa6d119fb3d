use chrono::NaiveDate;
use meridian_data::PartitionKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One partition that was actually processed, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPartition {
    pub key: PartitionKey,
    pub source: PathBuf,
    pub record_count: usize,
}

/// Cumulative bookkeeping for one resumable run.
///
/// Created fresh when no checkpoint exists, otherwise adopted from the
/// persisted checkpoint; mutated and re-persisted after every partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingState {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub validation_start_date: NaiveDate,
    pub validation_end_date: NaiveDate,
    #[serde(default)]
    pub processed: Vec<ProcessedPartition>,
    #[serde(default)]
    pub total_partitions: usize,
}

impl TrainingState {
    #[must_use]
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        validation_start_date: NaiveDate,
        validation_end_date: NaiveDate,
    ) -> Self {
        Self {
            start_date,
            end_date,
            validation_start_date,
            validation_end_date,
            processed: Vec::new(),
            total_partitions: 0,
        }
    }

    /// Completion is tracked at month granularity: any processed record for
    /// the month marks the whole month done, regardless of file identity.
    #[must_use]
    pub fn is_processed(&self, key: PartitionKey) -> bool {
        self.processed.iter().any(|p| p.key == key)
    }

    pub fn record(&mut self, key: PartitionKey, source: PathBuf, record_count: usize) {
        self.processed.push(ProcessedPartition { key, source, record_count });
    }

    #[must_use]
    pub fn last_processed(&self) -> Option<PartitionKey> {
        self.processed.last().map(|p| p.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state() -> TrainingState {
        TrainingState::new(
            date(2020, 1, 1),
            date(2020, 3, 31),
            date(2020, 4, 1),
            date(2020, 4, 30),
        )
    }

    #[test]
    fn test_record_and_query_by_month() {
        let mut state = state();
        assert!(!state.is_processed(PartitionKey::new(2020, 1)));

        state.record(PartitionKey::new(2020, 1), PathBuf::from("2020/01/a.jsonl"), 10);
        assert!(state.is_processed(PartitionKey::new(2020, 1)));
        assert!(!state.is_processed(PartitionKey::new(2020, 2)));
        assert_eq!(state.last_processed(), Some(PartitionKey::new(2020, 1)));
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut state = state();
        state.record(PartitionKey::new(2020, 2), PathBuf::from("2020/02/b.jsonl"), 7);
        state.total_partitions = 3;

        let json = serde_json::to_string(&state).unwrap();
        let back: TrainingState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
