//! HTTP object store backend.
//!
//! Speaks the minimal verb set most object stores and WebDAV-style servers
//! accept: `HEAD`/`GET`/`PUT`/`DELETE` on `{base_url}/{key}`, with an
//! optional bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use visage_core::{BlobStore, Error, Result};

/// Blob store reached over HTTP.
pub struct HttpBlobStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(visage_core::defaults::SYNC_TIMEOUT_SECS),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(key))
            .timeout(self.timeout);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn status_error(op: &str, key: &str, status: StatusCode) -> Error {
    Error::Sync(format!("{} {} returned {}", op, key, status))
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let response = self.request(reqwest::Method::HEAD, key).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(status_error("HEAD", key, s)),
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self.request(reqwest::Method::GET, key).send().await?;
        match response.status() {
            s if s.is_success() => {
                let bytes = response.bytes().await?;
                debug!(sync_key = %key, bytes = bytes.len(), "http_blob: get");
                Ok(bytes.to_vec())
            }
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("blob {}", key))),
            s => Err(status_error("GET", key, s)),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error("PUT", key, status));
        }
        debug!(sync_key = %key, bytes = data.len(), "http_blob: put");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self.request(reqwest::Method::DELETE, key).send().await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            s => Err(status_error("DELETE", key, s)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let store = HttpBlobStore::new("https://blobs.example.com/gallery/");
        assert_eq!(
            store.url("index.bin"),
            "https://blobs.example.com/gallery/index.bin"
        );
    }

    #[test]
    fn test_default_timeout() {
        let store = HttpBlobStore::new("http://localhost:9000");
        assert_eq!(store.timeout, Duration::from_secs(30));
        assert_eq!(store.backend_name(), "http");
    }
}
