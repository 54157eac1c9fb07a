//! Blob store clients for raw page snapshots.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::traits::BaseSnapshotStore;

/// HTTP-backed blob store: `PUT {base_url}/{key}` with an optional bearer
/// token. Matches any S3/R2-style gateway that accepts raw puts.
pub struct HttpSnapshotStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSnapshotStore {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl BaseSnapshotStore for HttpSnapshotStore {
    async fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        let mut request = self
            .client
            .put(format!("{}/{}", self.base_url, key))
            .header("Content-Type", "text/html")
            .body(body.to_vec());

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Snapshot put failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Snapshot put returned {}", response.status());
        }

        Ok(())
    }
}

/// Discards snapshots. Used when no snapshot store is configured.
pub struct NoopSnapshotStore;

#[async_trait]
impl BaseSnapshotStore for NoopSnapshotStore {
    async fn put(&self, _key: &str, _body: &[u8]) -> Result<()> {
        Ok(())
    }
}
