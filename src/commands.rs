// ─── Pipeline Entry Points ───
// The two operations callers drive: bring an instance in line with its
// manifest, and launch it. Each call owns its own state; nothing is shared
// between attempts.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::core::downloader::ContentSource;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::java::RuntimeProvisioner;
use crate::core::launch::{
    resolve, LaunchOutcome, LegacyCompatibilityShim, LineSink, ProcessOrchestrator,
};
use crate::core::manifest::{ManifestModel, RouteSpec};
use crate::core::settings::LaunchSettings;
use crate::core::sync::{ContentSyncEngine, InstallOutcome, ProgressSink};

/// Verify every manifest file under `instance_root`, transferring whatever is
/// missing or stale.
#[instrument(skip_all, fields(profile = %manifest.profile_id, instance = ?instance_root))]
pub async fn verify_and_install(
    manifest: &ManifestModel,
    instance_root: &Path,
    source: &dyn ContentSource,
    progress: ProgressSink<'_>,
    cancel: &CancellationToken,
) -> LauncherResult<InstallOutcome> {
    let outcome = ContentSyncEngine::new(source)
        .sync(manifest, instance_root, progress, cancel)
        .await?;
    info!(
        "Instance ready: {} downloaded, {} verified",
        outcome.downloaded, outcome.verified
    );
    Ok(outcome)
}

/// Provision the runtime, resolve the plan, apply compatibility handling,
/// then run the client until it exits or `cancel` fires. Content is expected
/// to be in place already; see [`verify_and_install`].
#[instrument(skip_all, fields(profile = %manifest.profile_id, server = %route.address, port = route.port))]
pub async fn launch(
    manifest: &ManifestModel,
    settings: &LaunchSettings,
    route: &RouteSpec,
    instance_dir: &Path,
    source: &dyn ContentSource,
    on_line: LineSink,
    cancel: &CancellationToken,
) -> LauncherResult<LaunchOutcome> {
    route.validate()?;

    if let Some(runtime) = RuntimeProvisioner::new(source)
        .ensure_runtime(manifest, instance_dir, cancel)
        .await?
    {
        info!("Runtime available at {:?}", runtime);
    }
    if cancel.is_cancelled() {
        return Err(LauncherError::Cancelled);
    }

    let mut plan = resolve(manifest, route, instance_dir, settings)?;
    let mode = LegacyCompatibilityShim::new(settings).apply(&mut plan, manifest, route)?;
    for note in &plan.notes {
        warn!("{}", note);
    }
    info!("Launching in {:?} mode", mode);

    ProcessOrchestrator::new(settings)
        .launch(&plan, route, on_line, cancel)
        .await
}

/// Read a manifest from a local path or an `http(s)://` URL.
pub async fn load_manifest(location: &str) -> LauncherResult<ManifestModel> {
    if !(location.starts_with("http://") || location.starts_with("https://")) {
        return ManifestModel::load(Path::new(location)).await;
    }

    let client = build_http_client().map_err(|e| LauncherError::transfer(location, e))?;
    let response = client
        .get(location)
        .send()
        .await
        .map_err(|e| LauncherError::transfer(location, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(LauncherError::transfer(
            location,
            format!("HTTP {}", status.as_u16()),
        ));
    }
    let raw = response
        .text()
        .await
        .map_err(|e| LauncherError::transfer(location, e))?;
    ManifestModel::from_json(&raw)
}
