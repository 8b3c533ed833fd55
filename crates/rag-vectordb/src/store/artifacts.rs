//! Sources for the two index artifacts: a local directory or an HTTP prefix
//! (public or pre-signed object-store URL).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rag_core::config::StoreLocation;
use tracing::debug;

use crate::error::{Result, VectorDbError};

/// Fetches named artifacts as raw bytes.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Build the source matching a configured location.
pub fn source_for(location: &StoreLocation) -> Result<Box<dyn ArtifactSource>> {
    Ok(match location {
        StoreLocation::Dir(dir) => Box::new(LocalDirSource::new(dir.clone())),
        StoreLocation::Url(url) => Box::new(HttpSource::new(url.clone())?),
    })
}

/// Artifacts read from a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactSource for LocalDirSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        debug!("reading artifact {}", path.display());
        tokio::fs::read(&path).await.map_err(|e| VectorDbError::Fetch {
            name: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Artifacts downloaded with `GET <base>/<name>`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: String,
    client: reqwest::Client,
}

impl HttpSource {
    const TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(base: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base, Self::TIMEOUT)
    }

    /// Whole-download timeout per artifact.
    pub fn with_timeout(base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base = base.into();
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            VectorDbError::Fetch { name: base.clone(), message: format!("HTTP client: {e}") }
        })?;
        Ok(Self { base, client })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), name.trim_start_matches('/'))
    }
}

#[async_trait]
impl ArtifactSource for HttpSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.url_for(name);
        debug!("downloading artifact {url}");
        let fetch_err = |message: String| VectorDbError::Fetch { name: url.clone(), message };

        let response = self.client.get(&url).send().await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.base.clone()
    }
}
