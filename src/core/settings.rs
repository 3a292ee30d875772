use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::auth::LaunchAccountProfile;
use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "ManifestLauncher";
const SETTINGS_FILE: &str = "settings.json";

/// Caller-configured launch options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchSettings {
    pub min_memory_mb: u32,
    pub max_memory_mb: u32,
    pub account: LaunchAccountProfile,
    /// Runtime used when the manifest declares none.
    pub java_path: Option<PathBuf>,
    /// Parent of the per-instance compatibility homes.
    pub compat_root: Option<PathBuf>,
    /// Bound on output draining once the process has exited.
    pub output_drain_timeout_ms: u64,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            min_memory_mb: 512,
            max_memory_mb: 2048,
            account: LaunchAccountProfile::default(),
            java_path: None,
            compat_root: None,
            output_drain_timeout_ms: 2000,
        }
    }
}

impl LaunchSettings {
    /// Compatibility-home parent, defaulting to the local data directory.
    pub fn compat_root(&self) -> PathBuf {
        self.compat_root.clone().unwrap_or_else(default_compat_root)
    }

    /// Heap bounds with `min <= max` enforced.
    pub fn heap_bounds(&self) -> (u32, u32) {
        let max = self.max_memory_mb.max(1);
        (self.min_memory_mb.clamp(1, max), max)
    }
}

/// Default settings file: `<config dir>/ManifestLauncher/settings.json`.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(SETTINGS_FILE)
}

fn default_compat_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join("compat")
}

/// Read settings; a missing file yields defaults, a malformed one is an error.
pub fn load_settings(path: &Path) -> LauncherResult<LaunchSettings> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(LaunchSettings::default());
        }
        Err(source) => return Err(LauncherError::io(path, source)),
    };

    let mut settings: LaunchSettings = serde_json::from_str(&raw)?;
    settings.account = settings.account.sanitized();
    if settings.min_memory_mb > settings.max_memory_mb {
        warn!(
            "min_memory_mb {} exceeds max_memory_mb {}; clamping",
            settings.min_memory_mb, settings.max_memory_mb
        );
    }
    Ok(settings)
}
