// ─── ManifestLauncher Core ───
// Install-and-launch pipeline for manifest-described game builds.
//
// Architecture:
//   core/
//     manifest/   Manifest model + route to connect to
//     instance/   Instance layout + path containment
//     downloader/ Content source trait, streaming transfers, digests
//     sync/       Manifest-driven content sync
//     java/       Runtime provisioning + archive extraction
//     launch/     Plan resolution, legacy compatibility, process orchestration
//     auth/       Launch identity
//     settings    Caller-configured launch options

pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod instance;
pub mod java;
pub mod launch;
pub mod manifest;
pub mod settings;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
