// yt-dlp download engine for YouTube items

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::errors::DownloadError;
use crate::downloader::formats::{AudioFormat, AudioQuality, OutputFormat};
use crate::downloader::models::{NetworkConfig, Provider};
use crate::downloader::tools::find_binary;
use crate::downloader::traits::{DownloadEngine, EngineInvocation, ProgressEvent, ProgressSink};
use crate::downloader::utils;

/// Output template without the `[id]` suffix yt-dlp adds by default
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

pub struct YtDlpEngine {
    binary_path: String,
    network: NetworkConfig,
    cookies: Option<PathBuf>,
    download_timeout: Duration,
}

impl YtDlpEngine {
    pub fn new() -> Self {
        Self {
            binary_path: find_binary("yt-dlp"),
            network: NetworkConfig::default(),
            cookies: None,
            download_timeout: Duration::from_secs(900),
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

    pub fn build_args(&self, invocation: &EngineInvocation) -> Vec<String> {
        let mut args = Vec::new();

        match invocation.format {
            OutputFormat::Video(video) => {
                args.push("-f".to_string());
                args.push(video.selector());
                args.push("--merge-output-format".to_string());
                args.push(video.container().extension().to_string());
            }
            OutputFormat::Audio(audio) => {
                args.push("-f".to_string());
                args.push("bestaudio/best".to_string());
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push(audio.extension().to_string());
                if let Some(q) = audio_quality_arg(audio, invocation.quality) {
                    args.push("--audio-quality".to_string());
                    args.push(q);
                }
            }
        }

        args.extend([
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--no-update".to_string(),
            "-P".to_string(),
            invocation.output_dir.display().to_string(),
            "-o".to_string(),
            OUTPUT_TEMPLATE.to_string(),
        ]);

        args.extend(utils::get_timeout_args(&self.network));
        args.extend(utils::get_proxy_args(&self.network));
        args.extend(utils::get_cookie_args(self.cookies.as_deref()));

        args.push(invocation.source_url.clone());
        args
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lossless targets ignore bitrate; lossy ones default to 192k
fn audio_quality_arg(audio: AudioFormat, quality: Option<AudioQuality>) -> Option<String> {
    if audio.is_lossless() {
        return None;
    }
    let q = quality.unwrap_or_else(AudioQuality::youtube_default);
    Some(format!("{}K", q.kbps()))
}

/// Parse yt-dlp progress line like:
/// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
/// Returns (percent, status_string)
pub fn parse_ytdlp_progress(line: &str) -> Option<(f32, String)> {
    lazy_static::lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%(?:\s+of\s+~?\s*(\d+\.?\d*\s*\w+))?(?:\s+at\s+(\d+\.?\d*\s*\w+/s))?(?:\s+ETA\s+(\S+))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
        static ref EXTRACT_RE: Regex = Regex::new(r"\[ExtractAudio\]\s+Destination").unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let status = match (caps.get(2), caps.get(3), caps.get(4)) {
            (Some(size), Some(speed), Some(eta)) => format!(
                "{:.1}% of {} @ {} ETA {}",
                percent,
                size.as_str(),
                speed.as_str(),
                eta.as_str()
            ),
            (Some(size), Some(speed), None) => {
                format!("{:.1}% of {} @ {}", percent, size.as_str(), speed.as_str())
            }
            (Some(size), None, _) => format!("{:.1}% of {}", percent, size.as_str()),
            _ => format!("{:.1}%", percent),
        };
        return Some((percent, status));
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map(|m| m.as_str()).unwrap_or("file");
        let short_name: String = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename)
            .chars()
            .take(50)
            .collect();
        return Some((0.0, format!("Starting: {}", short_name)));
    }

    if MERGE_RE.is_match(line) {
        return Some((99.0, "Merging video and audio...".to_string()));
    }

    if EXTRACT_RE.is_match(line) {
        return Some((99.0, "Converting audio...".to_string()));
    }

    if ALREADY_RE.is_match(line) {
        return Some((100.0, "File already downloaded".to_string()));
    }

    None
}

/// Keeps reported percentages from going backwards when yt-dlp starts
/// the second (audio) stream of a merged download.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    highest: f32,
}

impl ProgressTracker {
    /// Status to emit for `line`, if any
    pub fn observe(&mut self, line: &str) -> Option<String> {
        let (percent, status) = parse_ytdlp_progress(line)?;
        let is_percentage = line.contains('%');
        if is_percentage && percent < self.highest {
            return None;
        }
        if percent > self.highest {
            self.highest = percent;
        }
        Some(status)
    }
}

#[async_trait]
impl DownloadEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn provider(&self) -> Provider {
        Provider::YouTube
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
        tracing::debug!("[yt-dlp] {} {}", self.binary_path, args.join(" "));

        let mut tracker = ProgressTracker::default();
        let output = utils::run_streaming_with_timeout(
            &self.binary_path,
            args,
            invocation.timeout,
            |line| {
                if let Some(status) = tracker.observe(line) {
                    progress.emit(ProgressEvent::status(status));
                }
            },
        )
        .await?;

        if output.status.success() {
            tracing::debug!("[yt-dlp] finished {}", invocation.source_url);
            return Ok(());
        }

        Err(DownloadError::from_tool_stderr(
            self.name(),
            output.status.code(),
            &output.stderr,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::formats::{Container, VideoFormat};

    fn invocation(format: OutputFormat, quality: Option<AudioQuality>) -> EngineInvocation {
        EngineInvocation {
            source_url: "https://www.youtube.com/watch?v=abc".to_string(),
            format,
            quality,
            output_dir: PathBuf::from("/tmp/work/001"),
            timeout: Duration::from_secs(900),
        }
    }

    #[test]
    fn video_args_select_and_merge() {
        let engine = YtDlpEngine::new().with_binary("yt-dlp");
        let format = OutputFormat::Video(VideoFormat::Capped {
            container: Container::Mp4,
            height: 720,
        });
        let args = engine.build_args(&invocation(format, None));

        assert_eq!(args[0], "-f");
        assert!(args[1].starts_with("bestvideo[height<=720][ext=mp4]"));
        let merge = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[merge + 1], "mp4");
        let out = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[out + 1], "%(title)s.%(ext)s");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn lossy_audio_gets_default_bitrate() {
        let engine = YtDlpEngine::new();
        let args = engine.build_args(&invocation(OutputFormat::Audio(AudioFormat::Mp3), None));
        let q = args.iter().position(|a| a == "--audio-quality").unwrap();
        assert_eq!(args[q + 1], "192K");
        assert!(args.contains(&"-x".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn lossless_audio_has_no_bitrate() {
        let engine = YtDlpEngine::new();
        let args = engine.build_args(&invocation(
            OutputFormat::Audio(AudioFormat::Flac),
            AudioQuality::from_kbps(320).ok(),
        ));
        assert!(!args.contains(&"--audio-quality".to_string()));
        let f = args.iter().position(|a| a == "--audio-format").unwrap();
        assert_eq!(args[f + 1], "flac");
    }

    #[test]
    fn network_options_are_forwarded() {
        let engine = YtDlpEngine::new()
            .with_network(NetworkConfig {
                proxy: Some("socks5://127.0.0.1:1080".to_string()),
                socket_timeout: Some(Duration::from_secs(30)),
            })
            .with_cookies(Some(PathBuf::from("/tmp/cookies.txt")));
        let args = engine.build_args(&invocation(OutputFormat::Video(VideoFormat::Best), None));
        assert!(args.windows(2).any(|w| w[0] == "--proxy" && w[1] == "socks5://127.0.0.1:1080"));
        assert!(args.windows(2).any(|w| w[0] == "--cookies" && w[1] == "/tmp/cookies.txt"));
        assert!(args.windows(2).any(|w| w[0] == "--socket-timeout" && w[1] == "30"));
    }

    #[test]
    fn parses_progress_lines() {
        let (p, status) = parse_ytdlp_progress(
            "[download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)",
        )
        .unwrap();
        assert!((p - 12.5).abs() < f32::EPSILON);
        assert!(status.starts_with("12.5% of 310.04MiB"));

        let (p, _) = parse_ytdlp_progress("[download] 100% of   10.00MiB in 00:00:03").unwrap();
        assert!((p - 100.0).abs() < f32::EPSILON);

        let (_, status) =
            parse_ytdlp_progress("[download] Destination: /tmp/work/001/My Song.webm").unwrap();
        assert_eq!(status, "Starting: My Song.webm");

        assert!(parse_ytdlp_progress("[youtube] abc: Downloading webpage").is_none());
    }

    #[test]
    fn tracker_suppresses_regressions() {
        let mut tracker = ProgressTracker::default();
        assert!(tracker.observe("[download]  50.0% of 10.00MiB at 1.00MiB/s ETA 00:05").is_some());
        assert!(tracker.observe("[download] 100.0% of 10.00MiB at 1.00MiB/s ETA 00:00").is_some());
        // second stream restarts at zero
        assert!(tracker.observe("[download]   3.0% of 2.00MiB at 1.00MiB/s ETA 00:02").is_none());
        assert_eq!(
            tracker.observe("[Merger] Merging formats into \"/tmp/x.mp4\"").as_deref(),
            Some("Merging video and audio...")
        );
    }
}
