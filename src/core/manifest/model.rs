use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::downloader::hash::HashAlgorithm;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::paths::manifest_segments;

/// Version string the catalog uses when a build has no real version.
pub const PLACEHOLDER_VERSION: &str = "0.0.0";

/// How the client is invoked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchMode {
    /// `java -jar <archive>`; the archive's manifest names the entry point.
    #[default]
    Archive,
    /// `java -cp <classpath> <entryClass>`.
    ExplicitClass,
}

/// What a remote locator points at; selects the fetch handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Asset,
    RuntimeArtifact,
}

/// One content-addressed file of the build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFileEntry {
    /// Slash-separated path relative to the instance root.
    pub path: String,
    /// Hex digest; compared case-insensitively.
    pub content_hash: String,
    /// Opaque locator handed to the content source.
    pub remote_key: String,
}

/// Runtime the build requires, relative to the instance directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRequirement {
    /// Relative path of the runtime executable (e.g. `runtime/bin/java`).
    pub path: String,
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Immutable description of one launchable build, as issued by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModel {
    pub profile_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub jvm_args: Vec<String>,
    #[serde(default)]
    pub game_args: Vec<String>,
    #[serde(default)]
    pub launch_mode: LaunchMode,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub runtime: Option<RuntimeRequirement>,
    #[serde(default)]
    pub files: Vec<ManifestFileEntry>,
}

impl ManifestModel {
    /// Parse a manifest from its JSON document.
    pub fn from_json(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a manifest document from disk.
    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LauncherError::io(path, source))?;
        Self::from_json(&raw)
    }

    /// The manifest version, or `None` when it is empty or the placeholder.
    pub fn declared_version(&self) -> Option<&str> {
        let version = self.version.trim();
        if version.is_empty() || version == PLACEHOLDER_VERSION {
            None
        } else {
            Some(version)
        }
    }

    /// Structural checks that must hold before any transfer starts.
    ///
    /// - every hash is hex with a recognised digest length
    /// - no two entries share a path after separator normalization (compared
    ///   case-insensitively only on Windows)
    pub fn validate(&self) -> LauncherResult<()> {
        let mut seen = HashSet::new();
        for entry in &self.files {
            if HashAlgorithm::for_digest(&entry.content_hash).is_none() {
                return Err(LauncherError::InvalidManifest(format!(
                    "unrecognised content hash {:?} for {}",
                    entry.content_hash, entry.path
                )));
            }
            if entry.remote_key.trim().is_empty() {
                return Err(LauncherError::InvalidManifest(format!(
                    "missing remote key for {}",
                    entry.path
                )));
            }
            let mut key = manifest_segments(&entry.path).join("/");
            if cfg!(target_os = "windows") {
                key = key.to_lowercase();
            }
            if !seen.insert(key) {
                return Err(LauncherError::InvalidManifest(format!(
                    "duplicate file entry {}",
                    entry.path
                )));
            }
        }

        if let Some(runtime) = &self.runtime {
            if let Some(sha) = &runtime.sha {
                if HashAlgorithm::for_digest(sha).is_none() {
                    return Err(LauncherError::InvalidManifest(format!(
                        "unrecognised runtime hash {sha:?}"
                    )));
                }
            }
        }

        Ok(())
    }
}
