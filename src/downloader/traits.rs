// Engine and progress abstractions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::errors::DownloadError;
use super::formats::{AudioQuality, OutputFormat};
use super::models::Provider;

/// Progress signal delivered to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// `current` of `total`, 1-based
    Determinate {
        current: usize,
        total: usize,
        label: Option<String>,
    },
    /// Free-form status such as "42.5%" or "Merging..."
    Indeterminate { status: String },
}

impl ProgressEvent {
    pub fn step(current: usize, total: usize) -> Self {
        Self::Determinate {
            current,
            total,
            label: None,
        }
    }

    pub fn labelled(current: usize, total: usize, label: impl Into<String>) -> Self {
        Self::Determinate {
            current,
            total,
            label: Some(label.into()),
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self::Indeterminate {
            status: status.into(),
        }
    }
}

/// Caller-supplied progress consumer. Calls are fire-and-forget and happen
/// on the task driving the download.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops everything
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Everything an engine needs for one item
#[derive(Debug, Clone)]
pub struct EngineInvocation {
    pub source_url: String,
    pub format: OutputFormat,
    pub quality: Option<AudioQuality>,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

/// External download engine (yt-dlp, spotdl, or a test stub).
///
/// `invoke` returns `Ok(())` when the tool exits successfully. It writes
/// files into `output_dir` and says nothing about which ones; the caller
/// finds them.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Provider whose items this engine can fetch
    fn provider(&self) -> Provider;

    /// Upper bound for a single media download
    fn download_timeout(&self) -> Duration;

    async fn invoke(
        &self,
        invocation: &EngineInvocation,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError>;
}
