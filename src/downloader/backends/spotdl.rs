// spotdl download engine for Spotify tracks

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::errors::DownloadError;
use crate::downloader::formats::OutputFormat;
use crate::downloader::models::{NetworkConfig, Provider};
use crate::downloader::tools::find_binary;
use crate::downloader::traits::{DownloadEngine, EngineInvocation, ProgressEvent, ProgressSink};
use crate::downloader::utils;

pub struct SpotDlEngine {
    binary_path: String,
    network: NetworkConfig,
    cookies: Option<PathBuf>,
    download_timeout: Duration,
}

impl SpotDlEngine {
    pub fn new() -> Self {
        Self {
            binary_path: find_binary("spotdl"),
            network: NetworkConfig::default(),
            cookies: None,
            download_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_binary(mut self, path: impl Into<String>) -> Self {
        self.binary_path = path.into();
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// spotdl only produces audio; a video format here has already been
    /// normalized away by the downloader, mp3 is the last resort.
    pub fn build_args(&self, invocation: &EngineInvocation) -> Vec<String> {
        let format = match invocation.format {
            OutputFormat::Audio(audio) => audio.extension(),
            OutputFormat::Video(_) => "mp3",
        };
        let quality = invocation.quality.unwrap_or_default();

        let mut args = vec![
            "download".to_string(),
            invocation.source_url.clone(),
            "--output".to_string(),
            invocation.output_dir.display().to_string(),
            "--format".to_string(),
            format.to_string(),
            "--bitrate".to_string(),
            quality.to_string(),
        ];

        args.extend(utils::get_proxy_args(&self.network));
        if let Some(cookies) = &self.cookies {
            args.push("--cookie-file".to_string());
            args.push(cookies.display().to_string());
        }
        args
    }
}

impl Default for SpotDlEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse status for a line of spotdl output
pub fn parse_spotdl_status(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.starts_with("Downloaded") {
        Some("Track downloaded".to_string())
    } else if trimmed.starts_with("Skipping") {
        Some("File already downloaded".to_string())
    } else if trimmed.starts_with("Processing query") || trimmed.starts_with("Found") {
        Some("Searching for audio source...".to_string())
    } else {
        None
    }
}

#[async_trait]
impl DownloadEngine for SpotDlEngine {
    fn name(&self) -> &'static str {
        "spotdl"
    }

    fn provider(&self) -> Provider {
        Provider::Spotify
    }

    fn download_timeout(&self) -> Duration {
        self.download_timeout
    }

    async fn invoke(
        &self,
        invocation: &EngineInvocation,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError> {
        let args = self.build_args(invocation);
        tracing::debug!("[spotdl] {} {}", self.binary_path, args.join(" "));
        progress.emit(ProgressEvent::status("Starting spotdl..."));

        let output = utils::run_streaming_with_timeout(
            &self.binary_path,
            args,
            invocation.timeout,
            |line| {
                if let Some(status) = parse_spotdl_status(line) {
                    progress.emit(ProgressEvent::status(status));
                }
            },
        )
        .await?;

        if output.status.success() {
            return Ok(());
        }

        Err(DownloadError::from_tool_stderr(
            self.name(),
            output.status.code(),
            &output.stderr,
        ))
    }
}
