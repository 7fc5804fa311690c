// MetadataResolver trait and common configuration

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{NetworkConfig, Provider, Resolved};
use crate::downloader::traits::ProgressSink;

/// Configuration for metadata lookups
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Proxy and socket timeout forwarded to the tool
    pub network: NetworkConfig,
    /// Path to cookies.txt file
    pub cookies_path: Option<PathBuf>,
    /// Limit for a single video / track lookup
    pub item_timeout: Duration,
    /// Limit for a playlist / album lookup
    pub collection_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            cookies_path: None,
            item_timeout: Duration::from_secs(60),
            collection_timeout: Duration::from_secs(120),
        }
    }
}

impl ExtractorConfig {
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn with_collection_timeout(mut self, timeout: Duration) -> Self {
        self.collection_timeout = timeout;
        self
    }
}

/// Turns a URL into a single item or a collection
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Name of the resolver (for logging)
    fn name(&self) -> &'static str;

    /// Provider whose URLs this resolver understands
    fn provider(&self) -> Provider;

    /// Collections report `(current, total)` per entry while parsing.
    /// Failures are `ResolutionFailure`, `Timeout` or `ToolNotFound`.
    async fn resolve(
        &self,
        url: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Resolved, DownloadError>;
}
