//! Data types produced by the profile summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Connection totals keyed by a formatted time bucket (`2019-11-04` or `2019-11-04T10`).
pub type Buckets = BTreeMap<String, u64>;

/// Half-open `[from, to)` range of update times to include. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SummaryWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| t >= from) && self.to.is_none_or(|to| t < to)
    }
}

/// Bucket size for connection totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Granularity {
    Day,
    Hour,
}

impl Granularity {
    pub fn format(self) -> &'static str {
        match self {
            Granularity::Day => "%Y-%m-%d",
            Granularity::Hour => "%Y-%m-%dT%H",
        }
    }
}

/// The update with the most connections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargestUpdate {
    pub connections: u64,
    pub at: DateTime<Utc>,
}

/// Aggregate view over the updates of a profile file that fall in a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub updates: usize,
    pub skipped_keys: usize,
    pub total_connections: u64,
    pub largest_update: Option<LargestUpdate>,
    pub avg_connections: f64,
    pub stddev_connections: f64,
    /// Mean of `maxTime - minTime` over updates with parseable timestamps.
    pub avg_window_hours: f64,
    pub per_day: Buckets,
    pub per_hour: Buckets,
}

impl ProfileSummary {
    pub fn buckets(&self, granularity: Granularity) -> &Buckets {
        match granularity {
            Granularity::Day => &self.per_day,
            Granularity::Hour => &self.per_hour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_window_is_half_open() {
        let window = SummaryWindow {
            from: Some(ts("2019-10-31T23:00:00Z")),
            to: Some(ts("2019-11-30T23:00:00Z")),
        };
        assert!(window.contains(ts("2019-10-31T23:00:00Z")));
        assert!(window.contains(ts("2019-11-15T12:00:00Z")));
        assert!(!window.contains(ts("2019-11-30T23:00:00Z")));
        assert!(!window.contains(ts("2019-10-31T22:59:59Z")));
    }

    #[test]
    fn test_unbounded_window_contains_everything() {
        assert!(SummaryWindow::default().contains(ts("1970-01-01T00:00:00Z")));
    }
}
