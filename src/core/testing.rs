// Shared fixtures for unit tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use crate::core::downloader::{ByteStream, ContentSource};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::manifest::ContentKind;

/// In-memory content source that counts fetches per key.
#[derive(Default)]
pub struct MemorySource {
    objects: HashMap<String, Vec<u8>>,
    stalled: HashMap<String, Vec<u8>>,
    fetches: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, key: &str, bytes: &[u8]) -> Self {
        self.objects.insert(key.to_string(), bytes.to_vec());
        self
    }

    /// Delivers `prefix` and then never finishes.
    pub fn with_stalled_object(mut self, key: &str, prefix: &[u8]) -> Self {
        self.stalled.insert(key.to_string(), prefix.to_vec());
        self
    }

    pub fn fetches(&self, key: &str) -> usize {
        self.fetches
            .lock()
            .map(|counts| counts.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch(&self, remote_key: &str, _kind: ContentKind) -> LauncherResult<ByteStream> {
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut counts) = self.fetches.lock() {
            *counts.entry(remote_key.to_string()).or_default() += 1;
        }

        if let Some(prefix) = self.stalled.get(remote_key) {
            let first: LauncherResult<Bytes> = Ok(Bytes::from(prefix.clone()));
            return Ok(stream::iter(vec![first]).chain(stream::pending()).boxed());
        }

        let bytes = self
            .objects
            .get(remote_key)
            .cloned()
            .ok_or_else(|| LauncherError::transfer(remote_key, "not found"))?;
        // Two chunks so writers see more than one write.
        let split = bytes.len() / 2;
        let chunks: Vec<LauncherResult<Bytes>> = vec![
            Ok(Bytes::from(bytes[..split].to_vec())),
            Ok(Bytes::from(bytes[split..].to_vec())),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    hex::encode(Sha1::digest(bytes))
}

/// Write a jar at `path` with the given class entries and optional `Main-Class`.
pub fn write_jar(path: &Path, main_class: Option<&str>, classes: &[&str]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let mut manifest = String::from("Manifest-Version: 1.0\r\n");
    if let Some(main) = main_class {
        manifest.push_str(&format!("Main-Class: {main}\r\n"));
    }
    writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
    writer.write_all(manifest.as_bytes()).unwrap();

    for class in classes {
        let entry = format!("{}.class", class.replace('.', "/"));
        writer.start_file(entry, options).unwrap();
        writer.write_all(b"\xCA\xFE\xBA\xBE").unwrap();
    }
    writer.finish().unwrap();
}
