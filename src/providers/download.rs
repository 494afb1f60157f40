//! Streaming artifact transfer with cancellation.
//!
//! The transfer writes to a `<file>.part` temp path next to the canonical
//! destination and only renames into place after the full body arrived
//! (and matched the declared size, when one is declared). Cancellation
//! and failure both remove the temp file, so a partial artifact is never
//! reachable at the canonical path.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{MuninnError, Result, telemetry};

/// Temp path the transfer streams into before the atomic rename.
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Stream `url` into `dest`, observing `cancel` between chunks.
///
/// `expected_bytes` of 0 disables size verification. On success the
/// artifact is fully present at `dest`; on any other outcome neither
/// `dest` nor its temp file remains.
pub(crate) async fn fetch_artifact(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    expected_bytes: u64,
    model: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = part_path(dest);
    let result = stream_to_temp(client, url, &tmp, expected_bytes, model, cancel).await;

    match result {
        Ok(()) => {
            tokio::fs::rename(&tmp, dest).await?;
            debug!(model, dest = %dest.display(), "artifact moved into place");
            Ok(())
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&tmp).await
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                warn!(model, error = %rm, "failed to remove partial artifact");
            }
            Err(e)
        }
    }
}

async fn stream_to_temp(
    client: &reqwest::Client,
    url: &str,
    tmp: &Path,
    expected_bytes: u64,
    model: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let response = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(model, "transfer cancelled before response");
            return Err(MuninnError::DownloadCancelled);
        }
        response = client.get(url).send() => {
            response.map_err(|e| MuninnError::DownloadFailed(format!("request failed: {e}")))?
        }
    };

    let status = response.status();
    if !status.is_success() {
        return Err(MuninnError::DownloadFailed(format!(
            "server returned {status} for {url}"
        )));
    }

    let mut file = tokio::fs::File::create(tmp).await?;
    let mut stream = response.bytes_stream();
    let mut received: u64 = 0;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(model, received, "transfer cancelled");
                return Err(MuninnError::DownloadCancelled);
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                received += bytes.len() as u64;
                metrics::counter!(telemetry::DOWNLOAD_BYTES_TOTAL, "model" => model.to_owned())
                    .increment(bytes.len() as u64);
                file.write_all(&bytes).await?;
            }
            Some(Err(e)) => {
                return Err(MuninnError::DownloadFailed(format!("transfer error: {e}")));
            }
            None => break,
        }
    }

    file.flush().await?;
    file.sync_all().await?;

    if expected_bytes > 0 && received != expected_bytes {
        return Err(MuninnError::DownloadFailed(format!(
            "size mismatch: expected {expected_bytes} bytes, received {received}"
        )));
    }

    Ok(())
}
