// Request-level orchestration: resolve a URL, then download, pack and clean up

use tokio_util::sync::CancellationToken;

use crate::config::FetcherConfig;
use crate::downloader::backends::{SpotDlEngine, YtDlpEngine};
use crate::downloader::batch::BatchDownloader;
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::{MetadataResolver, SpotDlResolver, YtDlpResolver};
use crate::downloader::models::{BatchRequest, DownloadResult, Payload, Resolved};
use crate::downloader::orchestrator::Downloader;
use crate::downloader::packager;
use crate::downloader::traits::ProgressSink;
use crate::downloader::urls;

/// Bytes to hand to the user plus the per-item record behind them
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub payload: Payload,
    /// One entry per requested item, in request order
    pub results: Vec<DownloadResult>,
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DownloadResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Some, but not all, items succeeded
    pub fn is_partial(&self) -> bool {
        self.succeeded() < self.results.len()
    }

    /// e.g. "2 of 3 succeeded"
    pub fn summary(&self) -> String {
        format!("{} of {} succeeded", self.succeeded(), self.results.len())
    }
}

pub struct MediaFetcher {
    config: FetcherConfig,
    resolvers: Vec<Box<dyn MetadataResolver>>,
    batch: BatchDownloader,
}

impl MediaFetcher {
    /// Fetcher wired to yt-dlp and spotdl as configured
    pub fn new(config: FetcherConfig) -> Self {
        let extractor_config = config.extractor_config();
        let resolvers: Vec<Box<dyn MetadataResolver>> = vec![
            Box::new(
                YtDlpResolver::new(extractor_config.clone()).with_binary(config.ytdlp_path.clone()),
            ),
            Box::new(SpotDlResolver::new(extractor_config).with_binary(config.spotdl_path.clone())),
        ];

        let downloader = Downloader::new()
            .with_engine(Box::new(
                YtDlpEngine::new()
                    .with_binary(config.ytdlp_path.clone())
                    .with_network(config.network.clone())
                    .with_cookies(config.cookies_path.clone())
                    .with_timeout(config.youtube_download_timeout),
            ))
            .with_engine(Box::new(
                SpotDlEngine::new()
                    .with_binary(config.spotdl_path.clone())
                    .with_network(config.network.clone())
                    .with_cookies(config.cookies_path.clone())
                    .with_timeout(config.spotify_download_timeout),
            ));

        Self::from_parts(config, resolvers, downloader)
    }

    /// Fetcher with caller-supplied resolvers and engines
    pub fn from_parts(
        config: FetcherConfig,
        resolvers: Vec<Box<dyn MetadataResolver>>,
        downloader: Downloader,
    ) -> Self {
        Self {
            config,
            resolvers,
            batch: BatchDownloader::new(downloader),
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Resolve `url` into an item or a collection. Any failure aborts.
    pub async fn fetch_info(
        &self,
        url: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Resolved, DownloadError> {
        let url = url.trim();
        let provider = urls::classify(url)?;
        let resolver = self
            .resolvers
            .iter()
            .find(|r| r.provider() == provider)
            .ok_or_else(|| DownloadError::ToolNotFound(format!("no resolver for {}", provider)))?;

        tracing::info!("Resolving {} URL with {}: {}", provider, resolver.name(), url);
        resolver.resolve(url, progress).await
    }

    /// Download the selected items and return the deliverable in memory.
    ///
    /// Nothing written during the request survives it: the work directory
    /// is removed before returning, on success and on error. When nothing
    /// succeeds, `AllItemsFailed` carries every item's failure.
    pub async fn download(
        &self,
        request: &BatchRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        if request.items.is_empty() {
            return Err(DownloadError::EmptyBatch);
        }

        let root = &self.config.work_root;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| DownloadError::io(root, e))?;
        let work_dir = tempfile::Builder::new()
            .prefix("media-downloader-")
            .tempdir_in(root)
            .map_err(|e| DownloadError::io(root, e))?;
        tracing::debug!("Work directory {}", work_dir.path().display());

        let results = self
            .batch
            .download_all(request, work_dir.path(), progress, cancel)
            .await;

        let payload = packager::pack(
            &results,
            request.title.as_deref(),
            self.config.archive_title_limit,
        )
        .and_then(|deliverable| deliverable.into_payload());

        if let Err(e) = work_dir.close() {
            tracing::warn!("Could not remove work directory: {}", e);
        }

        let outcome = DownloadOutcome {
            payload: payload?,
            results,
        };
        tracing::info!("{} -> {}", outcome.summary(), outcome.payload.filename);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::ErrorKind;

    fn outcome(successes: usize, failures: usize) -> DownloadOutcome {
        let mut results = Vec::new();
        for i in 0..successes {
            results.push(DownloadResult::Success {
                file_path: format!("/tmp/{}.mp3", i).into(),
                display_filename: format!("{}.mp3", i),
            });
        }
        for i in 0..failures {
            results.push(DownloadResult::Failure {
                item_label: format!("item {}", i),
                kind: ErrorKind::EngineFailure,
                error_message: "failed".to_string(),
            });
        }
        DownloadOutcome {
            payload: Payload {
                bytes: Vec::new(),
                filename: "x.zip".to_string(),
                mime: "application/zip",
            },
            results,
        }
    }

    #[test]
    fn summary_counts_successes() {
        let partial = outcome(2, 1);
        assert_eq!(partial.summary(), "2 of 3 succeeded");
        assert!(partial.is_partial());
        assert_eq!(partial.failures().count(), 1);

        let full = outcome(3, 0);
        assert!(!full.is_partial());
        assert_eq!(full.summary(), "3 of 3 succeeded");
    }
}
