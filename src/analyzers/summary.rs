use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, warn};

use crate::analyzers::types::{
    Buckets, Granularity, LargestUpdate, ProfileSummary, SummaryWindow,
};
use crate::analyzers::utility::{MS_PER_HOUR, mean, spread};
use crate::profile::{ProfileMap, UpdateProfile};

fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Hours between the earliest departure and latest arrival of an update,
/// if both timestamps are present and parse.
fn window_hours(profile: &UpdateProfile<String>) -> Option<f64> {
    let min = parse_utc(profile.min_time.as_deref()?)?;
    let max = parse_utc(profile.max_time.as_deref()?)?;
    Some((max - min).num_milliseconds() as f64 / MS_PER_HOUR)
}

fn add_to_bucket(
    buckets: &mut Buckets,
    at: DateTime<FixedOffset>,
    granularity: Granularity,
    count: u64,
) {
    *buckets
        .entry(at.format(granularity.format()).to_string())
        .or_default() += count;
}

/// Summarizes the profiles whose update key is a timestamp inside `window`.
///
/// Keys that are not RFC 3339 timestamps are skipped and counted in
/// `skipped_keys`. Ties for the largest update keep the earliest key.
/// Day and hour buckets are formatted in the `buckets_in` time zone.
pub fn summarize(
    profiles: &ProfileMap<String>,
    window: SummaryWindow,
    buckets_in: FixedOffset,
) -> ProfileSummary {
    let mut summary = ProfileSummary::default();
    let mut counts = Vec::new();
    let mut windows = Vec::new();

    for (key, profile) in profiles {
        let Some(updated) = parse_utc(key) else {
            debug!(key = %key, "Skipping update with non-timestamp key");
            summary.skipped_keys += 1;
            continue;
        };

        if !window.contains(updated) {
            continue;
        }

        summary.updates += 1;
        summary.total_connections += profile.count;
        counts.push(profile.count as f64);

        let is_larger = summary
            .largest_update
            .as_ref()
            .is_none_or(|largest| profile.count > largest.connections);
        if is_larger {
            summary.largest_update = Some(LargestUpdate {
                connections: profile.count,
                at: updated,
            });
        }

        match window_hours(profile) {
            Some(hours) => windows.push(hours),
            None => debug!(key = %key, "Update has no parseable time window"),
        }

        let local = updated.with_timezone(&buckets_in);
        add_to_bucket(&mut summary.per_day, local, Granularity::Day, profile.count);
        add_to_bucket(&mut summary.per_hour, local, Granularity::Hour, profile.count);
    }

    if summary.skipped_keys > 0 {
        warn!(
            skipped = summary.skipped_keys,
            "Some update keys are not timestamps"
        );
    }

    let connections = spread(&counts);
    summary.avg_connections = connections.mean;
    summary.stddev_connections = connections.stddev;
    summary.avg_window_hours = mean(&windows);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn profile(count: u64, min: &str, max: &str) -> UpdateProfile<String> {
        UpdateProfile {
            count,
            min_time: Some(min.to_string()),
            max_time: Some(max.to_string()),
        }
    }

    fn sample() -> ProfileMap<String> {
        BTreeMap::from([
            (
                "2019-11-04T10:00:00.000Z".to_string(),
                profile(10, "2019-11-04T10:00:00.000Z", "2019-11-04T12:00:00.000Z"),
            ),
            (
                "2019-11-04T10:30:00.000Z".to_string(),
                profile(30, "2019-11-04T10:30:00.000Z", "2019-11-04T14:30:00.000Z"),
            ),
            (
                "2019-11-05T08:00:00.000Z".to_string(),
                profile(20, "2019-11-05T08:00:00.000Z", "2019-11-05T08:00:00.000Z"),
            ),
            (
                "2019-12-01T08:00:00.000Z".to_string(),
                profile(99, "2019-12-01T08:00:00.000Z", "2019-12-01T09:00:00.000Z"),
            ),
        ])
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn november() -> SummaryWindow {
        SummaryWindow {
            from: Some("2019-10-31T23:00:00Z".parse().unwrap()),
            to: Some("2019-11-30T23:00:00Z".parse().unwrap()),
        }
    }

    #[test]
    fn test_summarize_within_window() {
        let summary = summarize(&sample(), november(), utc());

        assert_eq!(summary.updates, 3);
        assert_eq!(summary.total_connections, 60);
        assert_eq!(summary.avg_connections, 20.0);
        assert_eq!(summary.avg_window_hours, 2.0);
        assert_eq!(
            summary.largest_update,
            Some(LargestUpdate {
                connections: 30,
                at: "2019-11-04T10:30:00Z".parse().unwrap(),
            })
        );
        assert_eq!(
            summary.per_day,
            BTreeMap::from([
                ("2019-11-04".to_string(), 40),
                ("2019-11-05".to_string(), 20),
            ])
        );
        assert_eq!(
            summary.per_hour,
            BTreeMap::from([
                ("2019-11-04T10".to_string(), 40),
                ("2019-11-05T08".to_string(), 20),
            ])
        );
    }

    #[test]
    fn test_summarize_unbounded_includes_all() {
        let summary = summarize(&sample(), SummaryWindow::default(), utc());
        assert_eq!(summary.updates, 4);
        assert_eq!(summary.largest_update.unwrap().connections, 99);
    }

    #[test]
    fn test_summarize_skips_non_timestamp_keys() {
        let mut profiles = sample();
        profiles.insert(
            crate::record::MISSING_KEY.to_string(),
            profile(5, "x", "y"),
        );

        let summary = summarize(&profiles, november(), utc());
        assert_eq!(summary.skipped_keys, 1);
        assert_eq!(summary.updates, 3);
    }

    #[test]
    fn test_summarize_ignores_unparseable_windows() {
        let profiles = BTreeMap::from([
            (
                "2019-11-04T10:00:00.000Z".to_string(),
                profile(1, "2019-11-04T10:00:00.000Z", "2019-11-04T11:00:00.000Z"),
            ),
            (
                "2019-11-04T11:00:00.000Z".to_string(),
                UpdateProfile {
                    count: 1,
                    min_time: None,
                    max_time: Some("2019-11-04T12:00:00.000Z".to_string()),
                },
            ),
        ]);

        let summary = summarize(&profiles, SummaryWindow::default(), utc());
        assert_eq!(summary.updates, 2);
        assert_eq!(summary.avg_window_hours, 1.0);
    }

    #[test]
    fn test_summarize_buckets_in_local_time() {
        let profiles = BTreeMap::from([
            (
                "2019-10-31T23:30:00.000Z".to_string(),
                profile(7, "2019-10-31T23:30:00.000Z", "2019-11-01T01:30:00.000Z"),
            ),
            (
                "2019-11-30T22:30:00.000Z".to_string(),
                profile(3, "2019-11-30T22:30:00.000Z", "2019-11-30T23:00:00.000Z"),
            ),
        ]);
        let brussels = FixedOffset::east_opt(3600).unwrap();

        let summary = summarize(&profiles, november(), brussels);
        assert_eq!(
            summary.per_day,
            BTreeMap::from([
                ("2019-11-01".to_string(), 7),
                ("2019-11-30".to_string(), 3),
            ])
        );
        assert_eq!(
            summary.per_hour,
            BTreeMap::from([
                ("2019-11-01T00".to_string(), 7),
                ("2019-11-30T23".to_string(), 3),
            ])
        );

        let in_utc = summarize(&profiles, november(), utc());
        assert!(in_utc.per_day.contains_key("2019-10-31"));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&BTreeMap::new(), november(), utc());
        assert_eq!(summary, ProfileSummary::default());
    }
}
