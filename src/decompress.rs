//! Gzip decompression of log fragments.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Decompresses an in-memory gzip buffer into a UTF-8 string.
///
/// Concatenated gzip members are decoded back to back, in stream order.
pub fn gunzip_bytes(bytes: &[u8]) -> io::Result<String> {
    let mut decoder = MultiGzDecoder::new(bytes);
    let mut out = String::new();
    decoder.read_to_string(&mut out)?;
    Ok(out)
}

/// Reads a gzip-compressed file and returns its full decompressed content.
///
/// # Errors
///
/// Fails if the file cannot be read, is not valid gzip, or ends mid-stream.
/// The error context always names `path`; no partial content is returned.
pub async fn read_and_gunzip(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let text = gunzip_bytes(&bytes)
        .with_context(|| format!("failed to gunzip {}", path.display()))?;

    debug!(
        path = %path.display(),
        compressed = bytes.len(),
        decompressed = text.len(),
        "Fragment decompressed"
    );
    Ok(text)
}
