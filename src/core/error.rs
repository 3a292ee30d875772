use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the install-and-launch pipeline.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Containment ─────────────────────────────────────
    #[error("Path {path:?} escapes the instance root {root:?}")]
    PathEscape { root: PathBuf, path: String },

    // ── Network ─────────────────────────────────────────
    #[error("Transfer failed for {locator}: {reason}")]
    Transfer { locator: String, reason: String },

    // ── Integrity ───────────────────────────────────────
    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Manifest ────────────────────────────────────────
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    // ── Runtime ─────────────────────────────────────────
    #[error("Runtime executable missing after provisioning: {0:?}")]
    RuntimeMissing(PathBuf),

    // ── Launch ──────────────────────────────────────────
    #[error("{}", render_launch_configuration(.message, .reasons))]
    LaunchConfiguration {
        message: String,
        reasons: Vec<String>,
    },

    #[error("Could not start runtime {executable:?}: {source}")]
    ProcessSpawn {
        executable: PathBuf,
        source: std::io::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Serialization / archives ────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn transfer(locator: impl Into<String>, reason: impl ToString) -> Self {
        LauncherError::Transfer {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    /// Launch configuration failure; keeps at most three diagnostic reasons.
    pub fn launch_configuration(message: impl Into<String>, mut reasons: Vec<String>) -> Self {
        reasons.truncate(3);
        LauncherError::LaunchConfiguration {
            message: message.into(),
            reasons,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LauncherError::Cancelled)
    }
}

fn render_launch_configuration(message: &str, reasons: &[String]) -> String {
    if reasons.is_empty() {
        format!("Launch configuration error: {message}")
    } else {
        format!(
            "Launch configuration error: {message} ({})",
            reasons.join("; ")
        )
    }
}
