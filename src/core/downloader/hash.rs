// ─── Content Hashing ───
// Streaming digests used as the staleness oracle for synchronized files.

use std::path::Path;

use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tokio::io::AsyncReadExt;

use crate::core::error::{LauncherError, LauncherResult};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Digest family, picked from the length of the expected hex digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Select the algorithm for a hex digest, or `None` if it is malformed.
    pub fn for_digest(hex_digest: &str) -> Option<Self> {
        let digest = hex_digest.trim();
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digest.len() {
            32 => Some(Self::Md5),
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }

    pub fn hasher(self) -> ContentHasher {
        match self {
            Self::Md5 => ContentHasher::Md5(Md5::new()),
            Self::Sha1 => ContentHasher::Sha1(Sha1::new()),
            Self::Sha256 => ContentHasher::Sha256(Sha256::new()),
        }
    }
}

/// Incremental hasher over one of the supported digests.
pub enum ContentHasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

impl ContentHasher {
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Md5(h) => h.update(bytes),
            Self::Sha1(h) => h.update(bytes),
            Self::Sha256(h) => h.update(bytes),
        }
    }

    pub fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Case-insensitive digest comparison.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Hash a file with a fixed-size read buffer.
pub async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> LauncherResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|source| LauncherError::io(path, source))?;
    let mut hasher = algorithm.hasher();
    let mut buffer = vec![0_u8; HASH_BUFFER_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|source| LauncherError::io(path, source))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize_hex())
}

/// Hash a file against an expected digest; returns the actual digest.
pub async fn hash_file_for(path: &Path, expected: &str) -> LauncherResult<String> {
    let algorithm = HashAlgorithm::for_digest(expected).ok_or_else(|| {
        LauncherError::InvalidManifest(format!("unrecognised content hash {expected:?}"))
    })?;
    hash_file(path, algorithm).await
}

/// SHA-256 hex digest of an in-memory buffer.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
