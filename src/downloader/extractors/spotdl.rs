// spotdl metadata resolver for Spotify tracks, albums and playlists
//
// `spotdl save` writes the resolved track list as JSON into a save file;
// stdout carries nothing useful.

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{ExtractorConfig, MetadataResolver};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{Collection, MediaItem, Provider, Resolved, TrackItem};
use crate::downloader::tools::find_binary;
use crate::downloader::traits::{ProgressEvent, ProgressSink};
use crate::downloader::urls::{self, SpotifyKind};
use crate::downloader::utils::{self, run_output_with_timeout};

/// One entry of a spotdl save file
#[derive(Debug, Deserialize)]
struct SavedSong {
    #[serde(default)]
    song_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<String>,
    #[serde(default)]
    album_name: Option<String>,
    /// Seconds
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    cover_url: Option<String>,
    #[serde(default)]
    list_name: Option<String>,
}

pub struct SpotDlResolver {
    spotdl_path: String,
    config: ExtractorConfig,
}

impl SpotDlResolver {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            spotdl_path: find_binary("spotdl"),
            config,
        }
    }

    pub fn with_binary(mut self, path: impl Into<String>) -> Self {
        self.spotdl_path = path.into();
        self
    }

    async fn save_track_list(&self, url: &str, collection: bool) -> Result<String, DownloadError> {
        let scratch = tempfile::tempdir().map_err(|e| DownloadError::io("tempdir", e))?;
        let save_file = scratch.path().join("tracks.spotdl");

        let mut args = vec![
            "save".to_string(),
            url.to_string(),
            "--save-file".to_string(),
            save_file.display().to_string(),
        ];
        args.extend(utils::get_proxy_args(&self.config.network));

        let limit = if collection {
            self.config.collection_timeout
        } else {
            self.config.item_timeout
        };
        tracing::debug!("[spotdl] {} {}", self.spotdl_path, args.join(" "));
        let output = run_output_with_timeout(&self.spotdl_path, args, limit).await?;

        match tokio::fs::read_to_string(&save_file).await {
            Ok(text) => Ok(text),
            Err(_) if !output.status.success() => Err(DownloadError::from_tool_stderr(
                "spotdl",
                output.status.code(),
                &output.stderr,
            )
            .into_resolution_failure()),
            Err(e) => Err(DownloadError::ResolutionFailure(format!(
                "spotdl produced no track list: {}",
                e
            ))),
        }
    }
}

fn to_track(song: SavedSong, fallback_url: &str) -> TrackItem {
    TrackItem {
        id: song.song_id,
        name: song.name.unwrap_or_else(|| "Unknown".to_string()),
        artists: if song.artists.is_empty() {
            vec!["Unknown".to_string()]
        } else {
            song.artists
        },
        album: song.album_name.unwrap_or_else(|| "Unknown".to_string()),
        duration_ms: (song.duration.unwrap_or(0.0).max(0.0) * 1000.0).round() as u64,
        source_url: song.url.unwrap_or_else(|| fallback_url.to_string()),
        cover_url: song.cover_url.unwrap_or_default(),
    }
}

fn default_title(kind: Option<SpotifyKind>) -> &'static str {
    match kind {
        Some(SpotifyKind::Album) => "Spotify Album",
        Some(SpotifyKind::Artist) => "Spotify Artist",
        _ => "Spotify Playlist",
    }
}

/// Parse a save file into tracks, reporting `(current, total)` per track
pub fn parse_save_file(
    text: &str,
    url: &str,
    progress: &dyn ProgressSink,
) -> Result<(Vec<TrackItem>, Option<String>), DownloadError> {
    let songs: Vec<SavedSong> = serde_json::from_str(text)
        .map_err(|e| DownloadError::ResolutionFailure(format!("Invalid save file: {}", e)))?;

    let total = songs.len();
    let list_name = songs.iter().find_map(|s| s.list_name.clone());
    let mut tracks = Vec::with_capacity(total);
    for (idx, song) in songs.into_iter().enumerate() {
        progress.emit(ProgressEvent::step(idx + 1, total));
        tracks.push(to_track(song, url));
    }
    Ok((tracks, list_name))
}

/// Build the resolution result for `url` from parsed tracks
pub fn assemble(
    url: &str,
    tracks: Vec<TrackItem>,
    list_name: Option<String>,
) -> Result<Resolved, DownloadError> {
    let kind = urls::spotify_kind(url);
    let is_collection = kind.map(|k| k.is_collection()).unwrap_or(true);

    if !is_collection {
        let track = tracks.into_iter().next().ok_or_else(|| {
            DownloadError::ResolutionFailure(format!("No track found for {}", url))
        })?;
        return Ok(Resolved::Item(MediaItem::Track(track)));
    }

    let items = tracks.into_iter().map(MediaItem::Track).collect();
    Ok(Resolved::Collection(Collection::new(
        urls::spotify_id(url).unwrap_or_default(),
        list_name.unwrap_or_else(|| default_title(kind).to_string()),
        "Spotify User",
        Provider::Spotify,
        items,
    )))
}

#[async_trait]
impl MetadataResolver for SpotDlResolver {
    fn name(&self) -> &'static str {
        "spotdl"
    }

    fn provider(&self) -> Provider {
        Provider::Spotify
    }

    async fn resolve(
        &self,
        url: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Resolved, DownloadError> {
        let collection = urls::spotify_kind(url)
            .map(|k| k.is_collection())
            .unwrap_or(true);
        progress.emit(ProgressEvent::status("Fetching Spotify info..."));

        let text = self.save_track_list(url, collection).await?;
        let (tracks, list_name) = parse_save_file(&text, url, progress)?;
        let resolved = assemble(url, tracks, list_name)?;
        tracing::info!("Resolved Spotify '{}'", resolved.title());
        Ok(resolved)
    }
}
