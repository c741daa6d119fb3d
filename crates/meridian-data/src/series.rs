use crate::error::{DataError, DataResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fallback series identifier for single-series datasets that carry no id
/// column of their own.
pub const DEFAULT_SERIES_ID: &str = "default";

/// One observed data point of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// An ordered collection of observations, the unit of data the fitting
/// capability consumes. Observations are kept sorted by (series, timestamp).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesFrame {
    observations: Vec<Observation>,
}

impl SeriesFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.sort_by(|a, b| {
            a.series_id.cmp(&b.series_id).then(a.timestamp.cmp(&b.timestamp))
        });
        Self { observations }
    }

    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct series identifiers, in frame order.
    #[must_use]
    pub fn series_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for obs in &self.observations {
            if ids.last() != Some(&obs.series_id.as_str()) {
                ids.push(&obs.series_id);
            }
        }
        ids.dedup();
        ids
    }

    /// Target values of one series, in timestamp order.
    #[must_use]
    pub fn values_for(&self, series_id: &str) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|obs| obs.series_id == series_id)
            .map(|obs| obs.value)
            .collect()
    }

    /// All target values in frame order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.value).collect()
    }

    /// Merge several frames into one, re-sorting into frame order.
    #[must_use]
    pub fn concat(frames: &[SeriesFrame]) -> Self {
        let observations = frames
            .iter()
            .flat_map(|f| f.observations.iter().cloned())
            .collect();
        Self::from_observations(observations)
    }
}

/// Read one JSONL partition file into a frame.
///
/// Each line is a JSON object. Column names are mapped through common
/// aliases: `timestamp`/`ds`/`date`/`datetime` for the time column,
/// `value`/`target`/`y` for the target, `series_id`/`item_id` for the series
/// identifier (absent ids fall back to [`DEFAULT_SERIES_ID`]).
pub fn read_partition(path: &Path) -> DataResult<SeriesFrame> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| DataError::Load(format!("{}: {e}", path.display())))?;

    let mut observations = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: serde_json::Value = serde_json::from_str(line).map_err(|e| {
            DataError::Convert(format!(
                "failed to parse jsonl line {} of {}: {e}",
                idx + 1,
                path.display()
            ))
        })?;
        observations.push(observation_from_record(&record, idx + 1)?);
    }

    if observations.is_empty() {
        return Err(DataError::Load(format!("partition file is empty: {}", path.display())));
    }

    Ok(SeriesFrame::from_observations(observations))
}

fn observation_from_record(record: &serde_json::Value, line: usize) -> DataResult<Observation> {
    let obj = record
        .as_object()
        .ok_or_else(|| DataError::Convert(format!("line {line}: record is not an object")))?;

    let timestamp = ["timestamp", "ds", "date", "datetime"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(parse_timestamp)
        .ok_or_else(|| DataError::Convert(format!("line {line}: no usable time column")))?;

    let value = ["value", "target", "y"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| DataError::Convert(format!("line {line}: no usable target column")))?;

    let series_id = ["series_id", "item_id"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(serde_json::Value::as_str)
        .unwrap_or(DEFAULT_SERIES_ID)
        .to_string();

    Ok(Observation { series_id, timestamp, value })
}

fn parse_timestamp(raw: &serde_json::Value) -> Option<DateTime<Utc>> {
    let text = raw.as_str()?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    // Plain calendar dates are taken as midnight UTC.
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
