// Common data models for resolvers, downloaders and the packager

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::errors::{DownloadError, ErrorKind};
use super::formats::{AudioQuality, OutputFormat};

/// Media provider an item was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    YouTube,
    Spotify,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YouTube => write!(f, "YouTube"),
            Self::Spotify => write!(f, "Spotify"),
        }
    }
}

/// Video information extracted from YouTube
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    /// 0 means unknown
    pub duration_seconds: u64,
    pub thumbnail_url: String,
    pub source_url: String,
    pub uploader: String,
    pub view_count: u64,
    /// yt-dlp's `YYYYMMDD`, or "Unknown"
    pub upload_date: String,
}

impl VideoItem {
    /// Upload date as ISO `YYYY-MM-DD` when yt-dlp provided one
    pub fn upload_date_iso(&self) -> Option<String> {
        let input = time::format_description::parse("[year][month][day]").ok()?;
        let output = time::format_description::parse("[year]-[month]-[day]").ok()?;
        let date = time::Date::parse(&self.upload_date, &input).ok()?;
        date.format(&output).ok()
    }
}

/// Track information resolved through spotdl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackItem {
    pub id: String,
    pub name: String,
    /// Ordered as Spotify lists them; may repeat
    pub artists: Vec<String>,
    pub album: String,
    /// 0 means unknown
    pub duration_ms: u64,
    pub source_url: String,
    pub cover_url: String,
}

impl TrackItem {
    pub fn artist_line(&self) -> String {
        if self.artists.is_empty() {
            "Unknown".to_string()
        } else {
            self.artists.join(", ")
        }
    }
}

/// A single downloadable item from either provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum MediaItem {
    #[serde(rename = "youtube")]
    Video(VideoItem),
    #[serde(rename = "spotify")]
    Track(TrackItem),
}

impl MediaItem {
    pub fn provider(&self) -> Provider {
        match self {
            Self::Video(_) => Provider::YouTube,
            Self::Track(_) => Provider::Spotify,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Video(v) => &v.id,
            Self::Track(t) => &t.id,
        }
    }

    /// Label shown in progress reports and failure entries
    pub fn label(&self) -> &str {
        match self {
            Self::Video(v) => &v.title,
            Self::Track(t) => &t.name,
        }
    }

    /// Canonical locator handed to the download engine
    pub fn source_url(&self) -> &str {
        match self {
            Self::Video(v) => &v.source_url,
            Self::Track(t) => &t.source_url,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Video(v) => Duration::from_secs(v.duration_seconds),
            Self::Track(t) => Duration::from_millis(t.duration_ms),
        }
    }
}

/// Playlist or album
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub owner: String,
    pub provider: Provider,
    pub items: Vec<MediaItem>,
    /// Sum of item durations at construction time
    pub total_duration: Duration,
}

impl Collection {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        owner: impl Into<String>,
        provider: Provider,
        items: Vec<MediaItem>,
    ) -> Self {
        let total_duration = items.iter().map(MediaItem::duration).sum();
        Self {
            id: id.into(),
            title: title.into(),
            owner: owner.into(),
            provider,
            items,
            total_duration,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items at `indices`, in index order; out-of-range indices are ignored
    pub fn select(&self, indices: &[usize]) -> Vec<MediaItem> {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted
            .into_iter()
            .filter_map(|i| self.items.get(i).cloned())
            .collect()
    }

    pub fn selected_duration(&self, indices: &[usize]) -> Duration {
        self.select(indices).iter().map(MediaItem::duration).sum()
    }
}

/// Outcome of resolving a URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resolved {
    Item(MediaItem),
    Collection(Collection),
}

impl Resolved {
    pub fn title(&self) -> &str {
        match self {
            Self::Item(item) => item.label(),
            Self::Collection(c) => &c.title,
        }
    }
}

/// One item to fetch into one directory
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub item: MediaItem,
    pub format: OutputFormat,
    /// Audio only
    pub quality: Option<AudioQuality>,
    pub target_directory: PathBuf,
}

/// A user's submission: the selected items and the options chosen for all of them
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub items: Vec<MediaItem>,
    pub format: OutputFormat,
    pub quality: Option<AudioQuality>,
    /// Collection title used to name the archive
    pub title: Option<String>,
}

impl BatchRequest {
    pub fn new(items: Vec<MediaItem>, format: OutputFormat) -> Self {
        Self {
            items,
            format,
            quality: None,
            title: None,
        }
    }

    pub fn with_quality(mut self, quality: Option<AudioQuality>) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Per-item outcome of a download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DownloadResult {
    Success {
        file_path: PathBuf,
        display_filename: String,
    },
    Failure {
        item_label: String,
        kind: ErrorKind,
        error_message: String,
    },
}

impl DownloadResult {
    pub fn failure(item_label: &str, error: &DownloadError) -> Self {
        Self::Failure {
            item_label: item_label.to_string(),
            kind: error.kind(),
            error_message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Final payload location before it is read into memory
#[derive(Debug, Clone, PartialEq)]
pub enum Deliverable {
    SingleFile {
        path: PathBuf,
        filename: String,
        mime_hint: &'static str,
    },
    Archive {
        bytes: Vec<u8>,
        filename: String,
    },
}

impl Deliverable {
    pub fn filename(&self) -> &str {
        match self {
            Self::SingleFile { filename, .. } | Self::Archive { filename, .. } => filename,
        }
    }
}

/// Bytes handed to the caller once on-disk artifacts are gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: &'static str,
}

/// Network configuration for engines
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Socket timeout passed to the tools
    pub socket_timeout: Option<Duration>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            socket_timeout: Some(Duration::from_secs(30)),
        }
    }
}
