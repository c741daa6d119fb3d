use crate::series::SeriesFrame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary statistics for a loaded frame, embedded in checkpoint records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStats {
    pub record_count: usize,
    pub series_count: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl DataStats {
    #[must_use]
    pub fn describe(frame: &SeriesFrame) -> Self {
        let timestamps = frame.observations().iter().map(|obs| obs.timestamp);
        Self {
            record_count: frame.record_count(),
            series_count: frame.series_ids().len(),
            start_time: timestamps.clone().min(),
            end_time: timestamps.max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Observation;

    #[test]
    fn test_describe_empty_frame() {
        let stats = DataStats::describe(&SeriesFrame::new());
        assert_eq!(stats.record_count, 0);
        assert_eq!(stats.series_count, 0);
        assert!(stats.start_time.is_none());
    }

    #[test]
    fn test_describe_time_bounds() {
        let frame = SeriesFrame::from_observations(vec![
            Observation {
                series_id: "a".to_string(),
                timestamp: "2020-01-03T00:00:00Z".parse().unwrap(),
                value: 1.0,
            },
            Observation {
                series_id: "b".to_string(),
                timestamp: "2020-01-01T00:00:00Z".parse().unwrap(),
                value: 2.0,
            },
        ]);
        let stats = DataStats::describe(&frame);
        assert_eq!(stats.record_count, 2);
        assert_eq!(stats.series_count, 2);
        assert_eq!(stats.start_time.unwrap().to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert_eq!(stats.end_time.unwrap().to_rfc3339(), "2020-01-03T00:00:00+00:00");
    }
}
