use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use sha1::{Digest, Sha1};
use tokio_util::sync::CancellationToken;

use manifest_launcher::{
    launch, verify_and_install, ByteStream, ContentKind, ContentSource, LaunchSettings,
    LauncherError, LauncherResult, LineSink, ManifestModel, OutputLine, OutputStream, RouteSpec,
    SyncAction, SyncProgress,
};

#[derive(Default)]
struct CatalogStub {
    objects: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl CatalogStub {
    fn with(mut self, key: &str, bytes: &[u8]) -> Self {
        self.objects.insert(key.to_string(), bytes.to_vec());
        self
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for CatalogStub {
    async fn fetch(&self, remote_key: &str, _kind: ContentKind) -> LauncherResult<ByteStream> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .objects
            .get(remote_key)
            .cloned()
            .ok_or_else(|| LauncherError::transfer(remote_key, "not found"))?;
        let chunk: LauncherResult<Bytes> = Ok(Bytes::from(bytes));
        Ok(stream::iter(vec![chunk]).boxed())
    }
}

fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

fn manifest_json(entries: &[(&str, &str, &str)]) -> String {
    let files: Vec<serde_json::Value> = entries
        .iter()
        .map(|(path, body, key)| {
            serde_json::json!({
                "path": path,
                "contentHash": sha1_hex(body.as_bytes()),
                "remoteKey": key,
            })
        })
        .collect();
    serde_json::json!({
        "profileId": "integration",
        "version": "1.20.1",
        "files": files,
    })
    .to_string()
}

fn write(path: &Path, bytes: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

#[tokio::test]
async fn install_downloads_missing_and_verifies_present() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("instance");
    let manifest = ManifestModel::from_json(&manifest_json(&[
        ("config/options.txt", "fov:90", "obj/options"),
        ("mods/example.jar", "mod bytes", "obj/mod"),
    ]))
    .unwrap();
    write(&instance.join("config/options.txt"), b"fov:90");

    let source = CatalogStub::default().with("obj/mod", b"mod bytes");
    let seen = Mutex::new(Vec::new());
    let progress = |p: SyncProgress| seen.lock().unwrap().push((p.index, p.action));

    let outcome = verify_and_install(
        &manifest,
        &instance,
        &source,
        &progress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.downloaded, 1);
    assert_eq!(outcome.verified, 1);
    assert_eq!(source.fetches(), 1);
    assert_eq!(
        std::fs::read(instance.join("mods/example.jar")).unwrap(),
        b"mod bytes"
    );
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, SyncAction::Verified), (2, SyncAction::Downloaded)]
    );
}

#[tokio::test]
async fn second_install_transfers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = ManifestModel::from_json(&manifest_json(&[
        ("a.txt", "alpha", "obj/a"),
        ("nested/b.txt", "beta", "obj/b"),
    ]))
    .unwrap();
    let source = CatalogStub::default()
        .with("obj/a", b"alpha")
        .with("obj/b", b"beta");
    let progress = |_: SyncProgress| {};
    let cancel = CancellationToken::new();

    verify_and_install(&manifest, dir.path(), &source, &progress, &cancel)
        .await
        .unwrap();
    let again = verify_and_install(&manifest, dir.path(), &source, &progress, &cancel)
        .await
        .unwrap();

    assert_eq!(again.downloaded, 0);
    assert_eq!(again.verified, 2);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn corrupt_content_is_rejected_and_never_promoted() {
    let dir = tempfile::tempdir().unwrap();
    let manifest =
        ManifestModel::from_json(&manifest_json(&[("data.bin", "expected", "obj/data")]))
            .unwrap();
    let source = CatalogStub::default().with("obj/data", b"tampered");
    let progress = |_: SyncProgress| {};

    let err = verify_and_install(
        &manifest,
        dir.path(),
        &source,
        &progress,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LauncherError::HashMismatch { .. }));
    assert!(!dir.path().join("data.bin").exists());
}

#[tokio::test]
async fn launch_rejects_escaping_preferred_archive() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("instance");
    let manifest = ManifestModel::from_json(&manifest_json(&[])).unwrap();
    let source = CatalogStub::default();
    let on_line: LineSink = Arc::new(|_: OutputLine| {});

    let route = RouteSpec::new("localhost", 25565).unwrap();
    let err = launch(
        &manifest,
        &LaunchSettings::default(),
        &route.with_preferred_archive("../outside.jar"),
        &instance,
        &source,
        on_line,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LauncherError::PathEscape { .. }));
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn launch_without_any_archive_reports_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = ManifestModel::from_json(&manifest_json(&[])).unwrap();
    let source = CatalogStub::default();
    let on_line: LineSink = Arc::new(|_: OutputLine| {});
    let route = RouteSpec::new("localhost", 25565).unwrap();

    let err = launch(
        &manifest,
        &LaunchSettings::default(),
        &route,
        dir.path(),
        &source,
        on_line,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        LauncherError::LaunchConfiguration { reasons, .. } => {
            assert!(!reasons.is_empty());
            assert!(reasons.len() <= 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[cfg(unix)]
fn write_runnable_jar(path: &Path, main_class: &str) {
    use std::io::Write;

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    writer
        .start_file("META-INF/MANIFEST.MF", zip::write::SimpleFileOptions::default())
        .unwrap();
    write!(writer, "Manifest-Version: 1.0\r\nMain-Class: {main_class}\r\n").unwrap();
    writer.finish().unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn launch_runs_client_and_forwards_output() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("instance");
    write_runnable_jar(&instance.join("client.jar"), "net.minecraft.client.main.Main");
    let runtime = instance.join("runtime/bin/java");
    write(
        &runtime,
        b"#!/bin/sh\nfor arg in \"$@\"; do echo \"$arg\"; done\necho finished 1>&2\nexit 7\n",
    );
    std::fs::set_permissions(&runtime, std::fs::Permissions::from_mode(0o755)).unwrap();

    let manifest = ManifestModel::from_json(
        &serde_json::json!({
            "profileId": "integration",
            "version": "1.20.1",
            "runtime": { "path": "runtime/bin/java" },
        })
        .to_string(),
    )
    .unwrap();
    let source = CatalogStub::default();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = lines.clone();
    let on_line: LineSink = Arc::new(move |line: OutputLine| {
        sink_lines.lock().unwrap().push(line);
    });

    let outcome = launch(
        &manifest,
        &LaunchSettings::default(),
        &RouteSpec::new("play.example.net", 25566).unwrap(),
        &instance,
        &source,
        on_line,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.exit_code, 7);
    assert_eq!(outcome.runtime, runtime);
    assert_eq!(source.fetches(), 0);

    let lines = lines.lock().unwrap();
    let stdout: Vec<&str> = lines
        .iter()
        .filter(|l| l.stream == OutputStream::Stdout)
        .map(|l| l.text.as_str())
        .collect();
    let jar = stdout.iter().position(|a| *a == "-jar").unwrap();
    assert!(stdout[jar + 1].ends_with("client.jar"));
    let server = stdout.iter().position(|a| *a == "--server").unwrap();
    assert_eq!(stdout[server + 1..server + 4], ["play.example.net", "--port", "25566"]);
    assert!(lines
        .iter()
        .any(|l| l.stream == OutputStream::Stderr && l.text == "finished"));
}
