// yt-dlp metadata resolver for YouTube videos and playlists

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{ExtractorConfig, MetadataResolver};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{Collection, MediaItem, Provider, Resolved, VideoItem};
use crate::downloader::tools::find_binary;
use crate::downloader::traits::{ProgressEvent, ProgressSink};
use crate::downloader::urls;
use crate::downloader::utils::{self, run_output_with_timeout};

pub struct YtDlpResolver {
    ytdlp_path: String,
    config: ExtractorConfig,
}

impl YtDlpResolver {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            ytdlp_path: find_binary("yt-dlp"),
            config,
        }
    }

    pub fn with_binary(mut self, path: impl Into<String>) -> Self {
        self.ytdlp_path = path.into();
        self
    }

    fn build_args(&self, url: &str, playlist: bool) -> Vec<String> {
        let mut args = if playlist {
            vec!["-J".to_string(), "--flat-playlist".to_string()]
        } else {
            vec!["--dump-json".to_string(), "--no-playlist".to_string()]
        };
        args.push("--no-warnings".to_string());
        args.extend(utils::get_timeout_args(&self.config.network));
        args.extend(utils::get_proxy_args(&self.config.network));
        args.extend(utils::get_cookie_args(self.config.cookies_path.as_deref()));
        args.push(url.to_string());
        args
    }

    async fn run_json(&self, url: &str, playlist: bool) -> Result<Value, DownloadError> {
        let limit = if playlist {
            self.config.collection_timeout
        } else {
            self.config.item_timeout
        };
        let args = self.build_args(url, playlist);
        tracing::debug!("[yt-dlp] {} {}", self.ytdlp_path, args.join(" "));

        let output = run_output_with_timeout(&self.ytdlp_path, args, limit).await?;
        if !output.status.success() {
            return Err(
                DownloadError::from_tool_stderr("yt-dlp", output.status.code(), &output.stderr)
                    .into_resolution_failure(),
            );
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::ResolutionFailure(format!("Invalid JSON: {}", e)))
    }
}

fn str_or<'a>(json: &'a Value, key: &str, default: &'a str) -> &'a str {
    json[key].as_str().unwrap_or(default)
}

fn seconds(json: &Value) -> u64 {
    json["duration"].as_f64().map(|d| d.max(0.0) as u64).unwrap_or(0)
}

fn thumbnail(json: &Value) -> String {
    json["thumbnail"]
        .as_str()
        .or_else(|| json["thumbnails"].get(0).and_then(|t| t["url"].as_str()))
        .unwrap_or("")
        .to_string()
}

/// Single video from `--dump-json` output
pub fn parse_video_json(json: &Value, requested_url: &str) -> Result<VideoItem, DownloadError> {
    let id = json["id"]
        .as_str()
        .ok_or_else(|| DownloadError::ResolutionFailure("video has no id".to_string()))?;

    Ok(VideoItem {
        id: id.to_string(),
        title: str_or(json, "title", "Unknown").to_string(),
        duration_seconds: seconds(json),
        thumbnail_url: thumbnail(json),
        source_url: requested_url.to_string(),
        uploader: str_or(json, "uploader", "Unknown").to_string(),
        view_count: json["view_count"].as_u64().unwrap_or(0),
        upload_date: str_or(json, "upload_date", "Unknown").to_string(),
    })
}

/// Playlist from `-J --flat-playlist` output. Null entries and entries
/// without an id are dropped.
pub fn parse_playlist_json(
    json: &Value,
    progress: &dyn ProgressSink,
) -> Result<Collection, DownloadError> {
    let entries = json["entries"].as_array().ok_or_else(|| {
        DownloadError::ResolutionFailure("No entries found in playlist".to_string())
    })?;
    let playlist_uploader = str_or(json, "uploader", "Unknown");
    let total = entries.len();

    let mut items = Vec::with_capacity(total);
    for (idx, entry) in entries.iter().enumerate() {
        progress.emit(ProgressEvent::step(idx + 1, total));

        let id = match entry["id"].as_str() {
            Some(id) if !id.is_empty() => id,
            _ => continue,
        };
        let source_url = match entry["url"].as_str() {
            Some(u) if u.starts_with("http") => u.to_string(),
            _ => format!("https://www.youtube.com/watch?v={}", id),
        };

        items.push(MediaItem::Video(VideoItem {
            id: id.to_string(),
            title: str_or(entry, "title", "Unknown").to_string(),
            duration_seconds: seconds(entry),
            thumbnail_url: thumbnail(entry),
            source_url,
            uploader: entry["uploader"]
                .as_str()
                .unwrap_or(playlist_uploader)
                .to_string(),
            view_count: entry["view_count"].as_u64().unwrap_or(0),
            upload_date: str_or(entry, "upload_date", "Unknown").to_string(),
        }));
    }

    if items.len() < total {
        tracing::debug!("Dropped {} unusable playlist entries", total - items.len());
    }

    Ok(Collection::new(
        str_or(json, "id", ""),
        str_or(json, "title", "Unknown Playlist"),
        playlist_uploader,
        Provider::YouTube,
        items,
    ))
}

#[async_trait]
impl MetadataResolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn provider(&self) -> Provider {
        Provider::YouTube
    }

    async fn resolve(
        &self,
        url: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Resolved, DownloadError> {
        if urls::is_playlist(url) {
            progress.emit(ProgressEvent::status("Fetching playlist..."));
            let json = self.run_json(url, true).await?;
            let collection = parse_playlist_json(&json, progress)?;
            tracing::info!(
                "Resolved playlist '{}' with {} videos",
                collection.title,
                collection.len()
            );
            Ok(Resolved::Collection(collection))
        } else {
            progress.emit(ProgressEvent::status("Fetching video info..."));
            let json = self.run_json(url, false).await?;
            let video = parse_video_json(&json, url)?;
            tracing::info!("Resolved video '{}'", video.title);
            Ok(Resolved::Item(MediaItem::Video(video)))
        }
    }
}
