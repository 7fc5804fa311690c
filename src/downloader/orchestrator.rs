// Single-item downloader: engine selection, timeout and artifact discovery

use std::path::PathBuf;

use super::errors::DownloadError;
use super::formats::OutputFormat;
use super::locator;
use super::models::{DownloadRequest, DownloadResult};
use super::traits::{DownloadEngine, EngineInvocation, ProgressEvent, ProgressSink};

pub struct Downloader {
    engines: Vec<Box<dyn DownloadEngine>>,
}

impl Downloader {
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
        }
    }

    /// Register an engine; the first one registered for a provider wins
    pub fn add_engine(&mut self, engine: Box<dyn DownloadEngine>) {
        self.engines.push(engine);
    }

    pub fn with_engine(mut self, engine: Box<dyn DownloadEngine>) -> Self {
        self.add_engine(engine);
        self
    }

    /// Download one item into `request.target_directory`.
    ///
    /// Never fails: every error becomes a `Failure` entry labelled with the
    /// item. Files written by the engine are left in place.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> DownloadResult {
        let label = request.item.label();
        match self.try_download(request, progress).await {
            Ok((file_path, display_filename)) => {
                tracing::info!("[Downloader] ✓ {} -> {}", label, display_filename);
                DownloadResult::Success {
                    file_path,
                    display_filename,
                }
            }
            Err(e) => {
                tracing::warn!("[Downloader] ✗ {} failed: {}", label, e);
                DownloadResult::failure(label, &e)
            }
        }
    }

    async fn try_download(
        &self,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<(PathBuf, String), DownloadError> {
        let provider = request.item.provider();
        let engine = self
            .engines
            .iter()
            .find(|e| e.provider() == provider)
            .ok_or_else(|| DownloadError::ToolNotFound(format!("no engine for {}", provider)))?;

        let format = if request.format.supported_by(provider) {
            request.format
        } else {
            let fallback = OutputFormat::default_for(provider);
            tracing::warn!(
                "{} does not support '{}', using '{}'",
                provider,
                request.format,
                fallback
            );
            fallback
        };

        let dir = &request.target_directory;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DownloadError::io(dir, e))?;

        let limit = engine.download_timeout();
        let invocation = EngineInvocation {
            source_url: request.item.source_url().to_string(),
            format,
            quality: if format.is_audio() { request.quality } else { None },
            output_dir: dir.clone(),
            timeout: limit,
        };

        tracing::debug!(
            "[Downloader] {} via {} as {}",
            invocation.source_url,
            engine.name(),
            format
        );
        progress.emit(ProgressEvent::status(format!(
            "Downloading {}...",
            request.item.label()
        )));

        // The engine enforces the same limit on its child process; this
        // bound also covers engines that never return.
        let waited = tokio::time::timeout(limit, engine.invoke(&invocation, progress)).await;
        match waited {
            Ok(result) => result?,
            Err(_) => {
                return Err(DownloadError::Timeout {
                    operation: format!("{} download", engine.name()),
                    limit,
                })
            }
        }

        let path = locator::locate(dir, &format)?;
        let display_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DownloadError::ArtifactNotFound {
                dir: dir.clone(),
                expected: format.extension().to_string(),
            })?;
        Ok((path, display_filename))
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}
