// URL classification for the supported providers

use regex::Regex;

use super::errors::DownloadError;
use super::models::Provider;

const YOUTUBE_PATTERNS: [&str; 5] = [
    "youtube.com/watch",
    "youtube.com/playlist",
    "youtu.be/",
    "youtube.com/shorts/",
    "music.youtube.com/",
];

const SPOTIFY_PATTERNS: [&str; 4] = [
    "spotify.com/track/",
    "spotify.com/album/",
    "spotify.com/playlist/",
    "spotify.com/artist/",
];

/// Kind of Spotify content a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyKind {
    Track,
    Album,
    Playlist,
    Artist,
}

impl SpotifyKind {
    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::Track)
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    YOUTUBE_PATTERNS.iter().any(|p| url.contains(p))
}

/// YouTube URL that carries a playlist
pub fn is_playlist(url: &str) -> bool {
    url.contains("list=")
}

pub fn is_spotify_url(url: &str) -> bool {
    SPOTIFY_PATTERNS.iter().any(|p| url.contains(p))
}

pub fn spotify_kind(url: &str) -> Option<SpotifyKind> {
    if url.contains("/track/") {
        Some(SpotifyKind::Track)
    } else if url.contains("/album/") {
        Some(SpotifyKind::Album)
    } else if url.contains("/playlist/") {
        Some(SpotifyKind::Playlist)
    } else if url.contains("/artist/") {
        Some(SpotifyKind::Artist)
    } else {
        None
    }
}

/// Base62 id following the content type segment
pub fn spotify_id(url: &str) -> Option<String> {
    lazy_static::lazy_static! {
        static ref ID_RE: Regex =
            Regex::new(r"/(?:track|album|playlist|artist)/([a-zA-Z0-9]+)").unwrap();
    }
    ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Provider for `url`, or `InvalidUrl`
pub fn classify(url: &str) -> Result<Provider, DownloadError> {
    let url = url.trim();
    if is_youtube_url(url) {
        Ok(Provider::YouTube)
    } else if is_spotify_url(url) {
        Ok(Provider::Spotify)
    } else {
        Err(DownloadError::InvalidUrl(url.to_string()))
    }
}
