// ─── Content Sync ───
// Reconciles an instance directory against the manifest file list.
// Strictly sequential: one entry at a time, in manifest order.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::core::downloader::{
    digests_match, discard, hash_file, stream_to_file, temp_sibling, ContentSource, HashAlgorithm,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{resolve_inside, InstanceLayout};
use crate::core::manifest::{ContentKind, ManifestFileEntry, ManifestModel};

/// What happened to one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Verified,
    Downloaded,
}

/// Per-entry progress report, sent after every entry.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgress {
    /// 1-based position in the manifest.
    pub index: usize,
    pub total: usize,
    pub path: String,
    pub action: SyncAction,
}

/// Result of one verify/install pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub downloaded: usize,
    pub verified: usize,
    pub instance_dir: PathBuf,
}

/// Caller-supplied progress callback.
pub type ProgressSink<'a> = &'a (dyn Fn(SyncProgress) + Send + Sync);

pub struct ContentSyncEngine<'a> {
    source: &'a dyn ContentSource,
}

impl<'a> ContentSyncEngine<'a> {
    pub fn new(source: &'a dyn ContentSource) -> Self {
        Self { source }
    }

    #[instrument(skip_all, fields(profile = %manifest.profile_id, files = manifest.files.len()))]
    pub async fn sync(
        &self,
        manifest: &ManifestModel,
        instance_dir: &Path,
        progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> LauncherResult<InstallOutcome> {
        manifest.validate()?;

        let layout = InstanceLayout::new(instance_dir);
        tokio::fs::create_dir_all(layout.root())
            .await
            .map_err(|source| LauncherError::io(layout.root(), source))?;

        let total = manifest.files.len();
        let mut outcome = InstallOutcome {
            downloaded: 0,
            verified: 0,
            instance_dir: layout.root().to_path_buf(),
        };

        for (position, entry) in manifest.files.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(LauncherError::Cancelled);
            }

            let dest = resolve_inside(layout.root(), &entry.path)?;
            let algorithm = HashAlgorithm::for_digest(&entry.content_hash).ok_or_else(|| {
                LauncherError::InvalidManifest(format!("bad hash for {}", entry.path))
            })?;

            let action = if is_current(&dest, entry, algorithm).await? {
                outcome.verified += 1;
                SyncAction::Verified
            } else {
                self.transfer(entry, &dest, algorithm, cancel).await?;
                outcome.downloaded += 1;
                SyncAction::Downloaded
            };

            progress(SyncProgress {
                index: position + 1,
                total,
                path: entry.path.clone(),
                action,
            });
        }

        info!(
            "Sync finished: {} downloaded, {} verified",
            outcome.downloaded, outcome.verified
        );
        Ok(outcome)
    }

    /// Fetch into a temporary sibling, verify, then rename over `dest`.
    async fn transfer(
        &self,
        entry: &ManifestFileEntry,
        dest: &Path,
        algorithm: HashAlgorithm,
        cancel: &CancellationToken,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::io(parent, source))?;
        }

        let temp = temp_sibling(dest);
        if let Err(err) =
            stream_to_file(self.source, &entry.remote_key, ContentKind::Asset, &temp, cancel).await
        {
            discard(&temp).await;
            return Err(err);
        }

        let actual = match hash_file(&temp, algorithm).await {
            Ok(actual) => actual,
            Err(err) => {
                discard(&temp).await;
                return Err(err);
            }
        };

        if !digests_match(&entry.content_hash, &actual) {
            discard(&temp).await;
            warn!(
                "Discarding {}: expected {}, got {}",
                entry.path, entry.content_hash, actual
            );
            return Err(LauncherError::HashMismatch {
                path: dest.to_path_buf(),
                expected: entry.content_hash.to_ascii_lowercase(),
                actual,
            });
        }

        if let Err(source) = tokio::fs::rename(&temp, dest).await {
            discard(&temp).await;
            return Err(LauncherError::io(dest, source));
        }

        debug!("Installed {}", entry.path);
        Ok(())
    }
}

async fn is_current(
    dest: &Path,
    entry: &ManifestFileEntry,
    algorithm: HashAlgorithm,
) -> LauncherResult<bool> {
    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Ok(false),
    }
    let actual = hash_file(dest, algorithm).await?;
    Ok(digests_match(&entry.content_hash, &actual))
}
