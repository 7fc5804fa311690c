// Fetcher configuration: tool paths, network, working directory and timeouts

use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::extractors::ExtractorConfig;
use crate::downloader::models::NetworkConfig;
use crate::downloader::packager::DEFAULT_TITLE_LIMIT;
use crate::downloader::tools::find_binary;

pub const ENV_YTDLP: &str = "MEDIA_DOWNLOADER_YTDLP";
pub const ENV_SPOTDL: &str = "MEDIA_DOWNLOADER_SPOTDL";
pub const ENV_WORK_DIR: &str = "MEDIA_DOWNLOADER_WORK_DIR";
pub const ENV_PROXY: &str = "MEDIA_DOWNLOADER_PROXY";
pub const ENV_COOKIES: &str = "MEDIA_DOWNLOADER_COOKIES";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "MEDIA_DOWNLOADER_DOWNLOAD_TIMEOUT";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// yt-dlp executable
    pub ytdlp_path: String,
    /// spotdl executable
    pub spotdl_path: String,
    /// Parent of the per-request work directories
    pub work_root: PathBuf,
    pub network: NetworkConfig,
    /// Netscape cookies.txt handed to both tools
    pub cookies_path: Option<PathBuf>,
    pub video_info_timeout: Duration,
    pub collection_info_timeout: Duration,
    pub youtube_download_timeout: Duration,
    pub spotify_download_timeout: Duration,
    /// Characters of the collection title kept in archive names
    pub archive_title_limit: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: find_binary("yt-dlp"),
            spotdl_path: find_binary("spotdl"),
            work_root: std::env::temp_dir(),
            network: NetworkConfig::default(),
            cookies_path: None,
            video_info_timeout: Duration::from_secs(60),
            collection_info_timeout: Duration::from_secs(120),
            youtube_download_timeout: Duration::from_secs(900),
            spotify_download_timeout: Duration::from_secs(300),
            archive_title_limit: DEFAULT_TITLE_LIMIT,
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl FetcherConfig {
    /// Defaults overridden by `MEDIA_DOWNLOADER_*` variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = env_value(ENV_YTDLP) {
            config.ytdlp_path = path;
        }
        if let Some(path) = env_value(ENV_SPOTDL) {
            config.spotdl_path = path;
        }
        if let Some(dir) = env_value(ENV_WORK_DIR) {
            config.work_root = PathBuf::from(dir);
        }
        if let Some(proxy) = env_value(ENV_PROXY) {
            config.network.proxy = Some(proxy);
        }
        if let Some(cookies) = env_value(ENV_COOKIES) {
            config.cookies_path = Some(PathBuf::from(cookies));
        }
        if let Some(raw) = env_value(ENV_DOWNLOAD_TIMEOUT) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config.youtube_download_timeout = Duration::from_secs(secs);
                    config.spotify_download_timeout = Duration::from_secs(secs);
                }
                _ => tracing::warn!("Ignoring {}='{}': not a positive number", ENV_DOWNLOAD_TIMEOUT, raw),
            }
        }

        config
    }

    pub fn with_ytdlp_path(mut self, path: impl Into<String>) -> Self {
        self.ytdlp_path = path.into();
        self
    }

    pub fn with_spotdl_path(mut self, path: impl Into<String>) -> Self {
        self.spotdl_path = path.into();
        self
    }

    pub fn with_work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = dir.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.network.proxy = proxy;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_download_timeouts(mut self, youtube: Duration, spotify: Duration) -> Self {
        self.youtube_download_timeout = youtube;
        self.spotify_download_timeout = spotify;
        self
    }

    pub fn with_archive_title_limit(mut self, limit: usize) -> Self {
        self.archive_title_limit = limit;
        self
    }

    /// Settings shared by the metadata resolvers
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::default()
            .with_network(self.network.clone())
            .with_cookies_path(self.cookies_path.clone())
            .with_item_timeout(self.video_info_timeout)
            .with_collection_timeout(self.collection_info_timeout)
    }
}
