use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::client::ContentSource;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::manifest::ContentKind;

/// Temporary sibling of `dest`, unique per transfer.
pub fn temp_sibling(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".into());
    dest.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4().simple()))
}

/// Stream one remote object into `target`, honouring cancellation between
/// chunks. Returns the number of bytes written.
///
/// The caller owns `target` afterwards: on error it may hold partial content
/// and must never be promoted.
pub async fn stream_to_file(
    source: &dyn ContentSource,
    remote_key: &str,
    kind: ContentKind,
    target: &Path,
    cancel: &CancellationToken,
) -> LauncherResult<u64> {
    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(LauncherError::Cancelled),
        opened = source.fetch(remote_key, kind) => opened?,
    };

    // Write inside a block so the handle is dropped before rename (Windows).
    let mut written = 0_u64;
    {
        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(|source| LauncherError::io(target, source))?;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LauncherError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|source| LauncherError::io(target, source))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|source| LauncherError::io(target, source))?;
        file.sync_all()
            .await
            .map_err(|source| LauncherError::io(target, source))?;
    }

    debug!("Fetched {} ({} bytes) -> {:?}", remote_key, written, target);
    Ok(written)
}

/// Best-effort removal of a scratch file.
pub async fn discard(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            debug!("Could not remove scratch file {:?}: {}", path, err);
        }
    }
}
