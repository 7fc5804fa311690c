// Media downloader core: YouTube and Spotify resolution, batch downloads
// through yt-dlp / spotdl, and packaging into a single deliverable.

pub mod config;
pub mod downloader;
pub mod fetcher;
pub mod logging;

pub use config::FetcherConfig;
pub use downloader::{
    BatchRequest, Collection, Deliverable, DownloadError, DownloadResult, ErrorKind, MediaItem,
    OutputFormat, Payload, ProgressEvent, ProgressSink, Provider, Resolved,
};
pub use fetcher::{DownloadOutcome, MediaFetcher};
pub use tokio_util::sync::CancellationToken;
