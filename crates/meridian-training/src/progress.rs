use crate::state::TrainingState;
use meridian_data::PartitionFile;
use tracing::{info, warn};

/// Partitions from `all` that the training state has not yet recorded.
///
/// Completion is tracked per month, not per file: a file added to a month
/// that was already checkpointed is skipped until the month is reprocessed.
/// A `None` state means nothing is considered processed.
#[must_use]
pub fn remaining_partitions(
    all: &[PartitionFile],
    state: Option<&TrainingState>,
) -> Vec<PartitionFile> {
    let Some(state) = state else {
        warn!("no training state available, treating every partition as remaining");
        return all.to_vec();
    };

    let remaining: Vec<PartitionFile> = all
        .iter()
        .filter(|file| !state.is_processed(file.key))
        .cloned()
        .collect();

    info!(
        remaining = remaining.len(),
        total = all.len(),
        "computed remaining partitions"
    );
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use meridian_data::PartitionKey;
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn partition(year: i32, month: u32, name: &str) -> PartitionFile {
        PartitionFile {
            path: PathBuf::from(format!("{year:04}/{month:02}/{name}")),
            key: PartitionKey::new(year, month),
        }
    }

    fn state_with(processed: &[(i32, u32)]) -> TrainingState {
        let mut state = TrainingState::new(
            date(2020, 1, 1),
            date(2020, 12, 31),
            date(2021, 1, 1),
            date(2021, 1, 31),
        );
        for (year, month) in processed {
            state.record(
                PartitionKey::new(*year, *month),
                PathBuf::from(format!("{year:04}/{month:02}/a.jsonl")),
                1,
            );
        }
        state
    }

    #[test]
    fn test_no_state_means_all_remaining() {
        let all = vec![partition(2020, 1, "a.jsonl"), partition(2020, 2, "a.jsonl")];
        assert_eq!(remaining_partitions(&all, None), all);
    }

    #[test]
    fn test_processed_months_are_excluded() {
        let all = vec![partition(2020, 1, "a.jsonl"), partition(2020, 2, "a.jsonl")];
        let state = state_with(&[(2020, 1)]);
        let remaining = remaining_partitions(&all, Some(&state));
        assert_eq!(remaining, vec![partition(2020, 2, "a.jsonl")]);
    }

    #[test]
    fn test_new_file_in_processed_month_is_skipped() {
        // Month granularity: b.jsonl appeared after 2020-01 was recorded.
        let all = vec![partition(2020, 1, "a.jsonl"), partition(2020, 1, "b.jsonl")];
        let state = state_with(&[(2020, 1)]);
        assert!(remaining_partitions(&all, Some(&state)).is_empty());
    }

    #[test]
    fn test_fully_processed_is_empty() {
        let all = vec![partition(2020, 1, "a.jsonl"), partition(2020, 2, "a.jsonl")];
        let state = state_with(&[(2020, 1), (2020, 2)]);
        assert!(remaining_partitions(&all, Some(&state)).is_empty());
    }
}
