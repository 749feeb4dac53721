//! Sequential scans over a directory of compressed live update fragments.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::decompress::read_and_gunzip;
use crate::profile::{ProfileAccumulator, ProfileMap};
use crate::record::{LogRecord, non_blank_lines, parse_records};

/// Lists the regular files in `dir`, sorted by path.
pub async fn list_fragments(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?
    {
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        if file_type.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    Ok(paths)
}

/// Builds connection profiles for every update found in the fragments of `dir`.
///
/// Fragments are read one after another; the first unreadable fragment or
/// malformed line aborts the scan.
#[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub async fn count_updates(dir: impl AsRef<Path>) -> Result<ProfileMap<String>> {
    let fragments = list_fragments(dir.as_ref()).await?;
    info!(fragments = fragments.len(), "Counting connections per update");

    let mut acc = ProfileAccumulator::new();
    let mut connections = 0usize;

    for path in &fragments {
        let text = read_and_gunzip(path).await?;
        let records = parse_records(&text, &path.display().to_string())?;
        connections += records.len();

        for record in &records {
            acc.observe(record.update_key(), record);
        }

        debug!(
            fragment = %path.display(),
            records = records.len(),
            updates = acc.len(),
            "Processed live update"
        );
    }

    if acc.is_empty() {
        warn!(fragments = fragments.len(), "No connections found");
    }
    info!(connections, updates = acc.len(), "Counting complete");
    Ok(acc.finish())
}

/// Regroups raw connection lines by update.
///
/// Every line of every fragment in `input_dir` is appended to
/// `<output_dir>/<update>.json`. Returns the number of lines written.
#[tracing::instrument(skip_all, fields(
    input_dir = %input_dir.as_ref().display(),
    output_dir = %output_dir.as_ref().display()
))]
pub async fn split_by_update(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<usize> {
    let output_dir = output_dir.as_ref();
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let fragments = list_fragments(input_dir.as_ref()).await?;
    let mut written = 0usize;

    for path in &fragments {
        let text = read_and_gunzip(path).await?;

        let mut groups: BTreeMap<Option<String>, String> = BTreeMap::new();
        for (lno, line) in non_blank_lines(&text) {
            let record: LogRecord = serde_json::from_str(line).with_context(|| {
                format!("malformed connection at {}:{}", path.display(), lno)
            })?;

            let group = groups.entry(record.memento_version).or_default();
            group.push_str(line);
            group.push('\n');
            written += 1;
        }

        for (version, lines) in &groups {
            let target = output_dir.join(format!("{}.json", file_stem_for(version.as_deref())));
            append(&target, lines.as_bytes()).await?;
        }

        debug!(fragment = %path.display(), updates = groups.len(), "Fragment split");
    }

    info!(lines = written, fragments = fragments.len(), "Split complete");
    Ok(written)
}

/// File stem for records without an update identifier. A lone `%` not
/// followed by two hex digits never comes out of [`file_stem_for`].
const UNVERSIONED_STEM: &str = "%none";

/// Maps an update identifier to a file stem that is safe on common filesystems.
///
/// `%` and path-unsafe characters are percent-encoded, so distinct
/// identifiers always get distinct stems.
fn file_stem_for(version: Option<&str>) -> String {
    let Some(version) = version else {
        return UNVERSIONED_STEM.to_string();
    };

    let mut stem = String::with_capacity(version.len());
    for c in version.chars() {
        match c {
            '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {
                stem.push_str(&format!("%{:02X}", c as u32));
            }
            c if c.is_ascii_control() => stem.push_str(&format!("%{:02X}", c as u32)),
            c => stem.push(c),
        }
    }
    stem
}

async fn append(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;

    file.write_all(bytes)
        .await
        .with_context(|| format!("failed to append to {}", path.display()))?;
    file.flush().await?;
    Ok(())
}
