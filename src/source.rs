//! Where raw snapshots come from.
//!
//! A [`SnapshotSource`] hands back the undecoded protobuf bytes of one feed
//! snapshot. Decoding and everything after it belong to the refresh tick.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::{ApiKey, BasicClient, HttpClient, fetch_bytes};

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the current snapshot.
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Pulls snapshots over HTTP(S).
pub struct HttpSource<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpSource<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> SnapshotSource for HttpSource<C> {
    async fn fetch(&self) -> Result<Vec<u8>> {
        fetch_bytes(&self.client, &self.url).await
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Re-reads a protobuf snapshot from disk on every fetch.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read snapshot {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    async fn fetch(&self) -> Result<Vec<u8>> {
        (**self).fetch().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Picks a source for `location`: `http://` and `https://` go over the
/// network (with `api_key` sent as `Authorization: apikey <key>` when given),
/// anything else is treated as a file path.
pub fn source_from(
    location: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Box<dyn SnapshotSource>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let client = BasicClient::with_timeout(timeout)?;
        match api_key {
            Some(key) => Ok(Box::new(HttpSource::new(ApiKey::apikey(client, key)?, location))),
            None => Ok(Box::new(HttpSource::new(client, location))),
        }
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}
