//! Connection records parsed from newline-delimited JSON fragments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Key used for records that carry no update identifier.
pub const MISSING_KEY: &str = "<missing>";

/// Anything with departure and arrival timestamps that can be folded into a profile.
pub trait Connection {
    type Time: Ord + Clone;

    fn departure_time(&self) -> Option<&Self::Time>;
    fn arrival_time(&self) -> Option<&Self::Time>;
}

/// One connection line of a live update fragment.
///
/// Only the fields needed for profiling are kept; everything else in the
/// line is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default)]
    pub memento_version: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub arrival_time: Option<String>,
}

impl LogRecord {
    /// The update this connection belongs to, or [`MISSING_KEY`].
    pub fn update_key(&self) -> String {
        self.memento_version
            .clone()
            .unwrap_or_else(|| MISSING_KEY.to_string())
    }
}

// Timestamps are compared as raw strings, which is only temporal for
// uniformly formatted ISO-8601 values.
impl Connection for LogRecord {
    type Time = String;

    fn departure_time(&self) -> Option<&String> {
        self.departure_time.as_ref()
    }

    fn arrival_time(&self) -> Option<&String> {
        self.arrival_time.as_ref()
    }
}

/// Returns the non-blank lines of a fragment with their 1-based line numbers.
pub fn non_blank_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Parses newline-delimited JSON into records.
///
/// Blank lines are skipped. The first malformed line fails the whole parse,
/// with `source` and the line number in the error context.
pub fn parse_records(text: &str, source: &str) -> Result<Vec<LogRecord>> {
    non_blank_lines(text)
        .map(|(lno, line)| {
            serde_json::from_str::<LogRecord>(line)
                .with_context(|| format!("malformed connection at {}:{}", source, lno))
        })
        .collect()
}
