pub mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::commands::{launch, load_manifest, verify_and_install};
pub use crate::core::auth::LaunchAccountProfile;
pub use crate::core::downloader::{ByteStream, ContentSource, HttpContentSource};
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::launch::{LaunchOutcome, LineSink, OutputLine, OutputStream};
pub use crate::core::manifest::{ContentKind, ManifestModel, RouteSpec};
pub use crate::core::settings::{default_settings_path, load_settings, LaunchSettings};
pub use crate::core::sync::{InstallOutcome, SyncAction, SyncProgress};

/// Install the structured log subscriber. `RUST_LOG` overrides the default
/// filter. Logs go to stderr so child output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,manifest_launcher=debug"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}
