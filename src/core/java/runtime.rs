use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::extract::{ensure_executable, extract_archive, ArchiveFormat};
use crate::core::downloader::{
    digests_match, discard, hash_file_for, locator_file_name, stream_to_file, temp_sibling,
    ContentSource,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{resolve_inside, InstanceLayout};
use crate::core::manifest::{ContentKind, ManifestModel, RuntimeRequirement};

/// Makes sure the runtime a manifest declares exists inside the instance.
pub struct RuntimeProvisioner<'a> {
    source: &'a dyn ContentSource,
}

impl<'a> RuntimeProvisioner<'a> {
    pub fn new(source: &'a dyn ContentSource) -> Self {
        Self { source }
    }

    /// Returns the runtime executable path when the manifest declares one.
    #[instrument(skip_all, fields(profile = %manifest.profile_id))]
    pub async fn ensure_runtime(
        &self,
        manifest: &ManifestModel,
        instance_dir: &Path,
        cancel: &CancellationToken,
    ) -> LauncherResult<Option<PathBuf>> {
        let Some(requirement) = manifest.runtime.as_ref() else {
            return Ok(None);
        };

        let layout = InstanceLayout::new(instance_dir);
        let runtime_path = resolve_inside(layout.root(), &requirement.path)?;
        if is_file(&runtime_path).await {
            debug!("Runtime already present at {:?}", runtime_path);
            return Ok(Some(runtime_path));
        }

        let Some(artifact) = requirement.artifact.as_deref().filter(|a| !a.trim().is_empty())
        else {
            warn!(
                "Runtime {} is missing and the manifest names no artifact to fetch",
                requirement.path
            );
            return Ok(Some(runtime_path));
        };

        self.install(requirement, artifact, &layout, &runtime_path, cancel)
            .await?;

        if !is_file(&runtime_path).await {
            return Err(LauncherError::RuntimeMissing(runtime_path));
        }
        ensure_executable(&runtime_path)?;
        info!("Runtime ready at {:?}", runtime_path);
        Ok(Some(runtime_path))
    }

    async fn install(
        &self,
        requirement: &RuntimeRequirement,
        artifact: &str,
        layout: &InstanceLayout,
        runtime_path: &Path,
        cancel: &CancellationToken,
    ) -> LauncherResult<()> {
        let scratch_dir = layout.scratch_dir();
        tokio::fs::create_dir_all(&scratch_dir)
            .await
            .map_err(|source| LauncherError::io(&scratch_dir, source))?;

        let file_name = locator_file_name(artifact);
        let scratch = temp_sibling(&scratch_dir.join(&file_name));

        info!("Fetching runtime artifact {}", artifact);
        let written = match stream_to_file(
            self.source,
            artifact,
            ContentKind::RuntimeArtifact,
            &scratch,
            cancel,
        )
        .await
        {
            Ok(written) => written,
            Err(err) => {
                discard(&scratch).await;
                return Err(err);
            }
        };

        if let Err(err) = verify_artifact(requirement, artifact, &scratch, written).await {
            discard(&scratch).await;
            return Err(err);
        }

        match ArchiveFormat::from_name(&file_name) {
            Some(format) => {
                let archive = scratch.clone();
                let destination = layout.root().to_path_buf();
                let extracted = tokio::task::spawn_blocking(move || {
                    extract_archive(&archive, format, &destination)
                })
                .await
                .map_err(|join| LauncherError::io(&scratch, std::io::Error::other(join)))
                .and_then(|result| result);
                discard(&scratch).await;
                extracted
            }
            None => promote(&scratch, runtime_path).await,
        }
    }
}

async fn verify_artifact(
    requirement: &RuntimeRequirement,
    artifact: &str,
    scratch: &Path,
    written: u64,
) -> LauncherResult<()> {
    if let Some(expected) = requirement.size {
        if expected != written {
            return Err(LauncherError::transfer(
                artifact,
                format!("size mismatch: expected {expected} bytes, got {written}"),
            ));
        }
    }

    if let Some(expected) = requirement.sha.as_deref().filter(|s| !s.trim().is_empty()) {
        let actual = hash_file_for(scratch, expected).await?;
        if !digests_match(expected, &actual) {
            return Err(LauncherError::HashMismatch {
                path: scratch.to_path_buf(),
                expected: expected.to_ascii_lowercase(),
                actual,
            });
        }
    }

    Ok(())
}

async fn promote(scratch: &Path, runtime_path: &Path) -> LauncherResult<()> {
    if let Some(parent) = runtime_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| LauncherError::io(parent, source))?;
    }
    if let Err(source) = tokio::fs::rename(scratch, runtime_path).await {
        // Scratch and instance may sit on different volumes.
        debug!("Rename failed ({}), copying runtime instead", source);
        tokio::fs::copy(scratch, runtime_path)
            .await
            .map_err(|source| LauncherError::io(runtime_path, source))?;
        discard(scratch).await;
    }
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::core::testing::{sha1_hex, MemorySource};

    fn manifest_with(runtime: RuntimeRequirement) -> ManifestModel {
        ManifestModel {
            profile_id: "rt".into(),
            runtime: Some(runtime),
            ..Default::default()
        }
    }

    fn requirement(artifact: Option<&str>) -> RuntimeRequirement {
        RuntimeRequirement {
            path: "runtime/bin/java".into(),
            artifact: artifact.map(str::to_string),
            sha: None,
            size: None,
        }
    }

    #[tokio::test]
    async fn no_runtime_declared_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new();
        let manifest = ManifestModel::default();

        let resolved = RuntimeProvisioner::new(&source)
            .ensure_runtime(&manifest, dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(resolved.is_none());
        assert_eq!(source.total_fetches(), 0);
    }

    #[tokio::test]
    async fn present_runtime_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("runtime/bin")).unwrap();
        std::fs::write(dir.path().join("runtime/bin/java"), b"bin").unwrap();
        let source = MemorySource::new().with_object("jre/java", b"other");

        let resolved = RuntimeProvisioner::new(&source)
            .ensure_runtime(
                &manifest_with(requirement(Some("jre/java"))),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(resolved, Some(dir.path().join("runtime/bin/java")));
        assert_eq!(source.total_fetches(), 0);
    }

    #[tokio::test]
    async fn plain_artifact_is_moved_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_object("jre/java", b"#!/bin/sh\n");
        let mut req = requirement(Some("jre/java"));
        req.sha = Some(sha1_hex(b"#!/bin/sh\n"));
        req.size = Some(10);

        RuntimeProvisioner::new(&source)
            .ensure_runtime(&manifest_with(req), dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        let java = dir.path().join("runtime/bin/java");
        assert_eq!(std::fs::read(&java).unwrap(), b"#!/bin/sh\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&java).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn zip_artifact_is_extracted_into_instance() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut bytes);
            writer
                .start_file("runtime/bin/java", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"java").unwrap();
            writer.finish().unwrap();
        }
        let source = MemorySource::new().with_object("jre-17.zip", bytes.get_ref());

        RuntimeProvisioner::new(&source)
            .ensure_runtime(
                &manifest_with(requirement(Some("jre-17.zip"))),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("runtime/bin/java")).unwrap(),
            b"java"
        );
        let scratch = InstanceLayout::new(dir.path()).scratch_dir();
        assert_eq!(std::fs::read_dir(scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn size_mismatch_is_a_transfer_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_object("jre/java", b"short");
        let mut req = requirement(Some("jre/java"));
        req.size = Some(4096);

        let err = RuntimeProvisioner::new(&source)
            .ensure_runtime(&manifest_with(req), dir.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Transfer { .. }));
        assert!(!dir.path().join("runtime/bin/java").exists());
    }

    #[tokio::test]
    async fn hash_mismatch_leaves_no_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_object("jre/java", b"tampered");
        let mut req = requirement(Some("jre/java"));
        req.sha = Some(sha1_hex(b"genuine"));

        let err = RuntimeProvisioner::new(&source)
            .ensure_runtime(&manifest_with(req), dir.path(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::HashMismatch { .. }));
        assert!(!dir.path().join("runtime/bin/java").exists());
    }

    #[tokio::test]
    async fn archive_without_runtime_inside_is_runtime_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut bytes);
            writer
                .start_file("README", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        let source = MemorySource::new().with_object("jre.zip", bytes.get_ref());

        let err = RuntimeProvisioner::new(&source)
            .ensure_runtime(
                &manifest_with(requirement(Some("jre.zip"))),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::RuntimeMissing(_)));
    }

    #[tokio::test]
    async fn missing_artifact_locator_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new();

        let resolved = RuntimeProvisioner::new(&source)
            .ensure_runtime(
                &manifest_with(requirement(None)),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(resolved, Some(dir.path().join("runtime/bin/java")));
        assert_eq!(source.total_fetches(), 0);
    }
}
