use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::manifest::ContentKind;

/// Raw bytes of one remote object, delivered in chunks.
pub type ByteStream = BoxStream<'static, LauncherResult<Bytes>>;

/// Byte-stream side of the catalog collaborator.
///
/// Implementations fetch exactly once per call; the core performs no retries.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, remote_key: &str, kind: ContentKind) -> LauncherResult<ByteStream>;
}

/// HTTP content source resolving relative locators against per-kind bases.
pub struct HttpContentSource {
    client: Client,
    asset_base: String,
    runtime_base: String,
}

impl HttpContentSource {
    pub fn new(asset_base: impl Into<String>) -> LauncherResult<Self> {
        let asset_base = asset_base.into();
        let client =
            build_http_client().map_err(|e| LauncherError::transfer(asset_base.clone(), e))?;
        Ok(Self {
            client,
            runtime_base: asset_base.clone(),
            asset_base,
        })
    }

    /// Serve runtime artifacts from a different base than game files.
    pub fn with_runtime_base(mut self, runtime_base: impl Into<String>) -> Self {
        self.runtime_base = runtime_base.into();
        self
    }

    fn asset_url(&self, remote_key: &str) -> String {
        join_locator(&self.asset_base, remote_key)
    }

    fn runtime_url(&self, remote_key: &str) -> String {
        join_locator(&self.runtime_base, remote_key)
    }

    async fn open(&self, url: String) -> LauncherResult<ByteStream> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LauncherError::transfer(url.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::transfer(
                url,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        debug!("Streaming {}", url);
        let locator = url;
        Ok(response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| LauncherError::transfer(locator.clone(), e)))
            .boxed())
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch(&self, remote_key: &str, kind: ContentKind) -> LauncherResult<ByteStream> {
        let url = match kind {
            ContentKind::Asset => self.asset_url(remote_key),
            ContentKind::RuntimeArtifact => self.runtime_url(remote_key),
        };
        self.open(url).await
    }
}

/// Absolute URLs pass through; anything else is appended to `base`.
fn join_locator(base: &str, remote_key: &str) -> String {
    let key = remote_key.trim();
    if key.starts_with("http://") || key.starts_with("https://") {
        return key.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// Last path segment of a locator, without query or fragment.
pub fn locator_file_name(remote_key: &str) -> String {
    let without_query = remote_key
        .split(['?', '#'])
        .next()
        .unwrap_or(remote_key);
    without_query
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("artifact")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_keys_are_joined_to_base() {
        assert_eq!(
            join_locator("https://cdn.example.net/files/", "/ab/abcdef"),
            "https://cdn.example.net/files/ab/abcdef"
        );
        assert_eq!(
            join_locator("https://cdn.example.net", "https://other.example.net/x.zip"),
            "https://other.example.net/x.zip"
        );
    }

    #[test]
    fn locator_file_name_strips_query() {
        assert_eq!(
            locator_file_name("https://cdn/runtimes/jre-8.tar.gz?sig=abc"),
            "jre-8.tar.gz"
        );
        assert_eq!(locator_file_name("runtime.zip"), "runtime.zip");
        assert_eq!(locator_file_name(""), "artifact");
    }
}
