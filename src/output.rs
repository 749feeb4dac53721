//! Output formatting and persistence for summaries.
//!
//! Supports pretty JSON, comma-joined series for plotting tools, and CSV.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::Buckets;
use csv::WriterBuilder;

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Joins values with commas, the format plotting tools accept as a pasted series.
pub fn join_series<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Writes a comma-joined series to stdout.
pub fn print_series<T: ToString>(values: impl IntoIterator<Item = T>) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", join_series(values))?;
    Ok(())
}

#[derive(Serialize)]
struct BucketRow<'a> {
    bucket: &'a str,
    connections: u64,
}

/// Writes bucketed connection totals as a `bucket,connections` CSV, replacing `path`.
pub fn write_buckets_csv(path: impl AsRef<Path>, buckets: &Buckets) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), rows = buckets.len(), "Writing bucket CSV");

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    for (bucket, &connections) in buckets {
        writer.serialize(BucketRow {
            bucket,
            connections,
        })?;
    }
    writer.flush()?;

    Ok(())
}
