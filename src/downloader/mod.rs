// Downloader module - resolution, per-item downloads, batching and packaging

pub mod backends;
pub mod batch;
pub mod diagnostics;
pub mod errors;
pub mod extractors;
pub mod formats;
pub mod locator;
pub mod models;
pub mod orchestrator;
pub mod packager;
pub mod tools;
pub mod traits;
pub mod urls;
pub mod utils;

pub use batch::BatchDownloader;
pub use errors::{DownloadError, ErrorKind};
pub use formats::{AudioFormat, AudioQuality, Container, OutputFormat, VideoFormat};
pub use models::{
    BatchRequest, Collection, Deliverable, DownloadRequest, DownloadResult, MediaItem,
    NetworkConfig, Payload, Provider, Resolved, TrackItem, VideoItem,
};
pub use orchestrator::Downloader;
pub use traits::{DownloadEngine, EngineInvocation, NoProgress, ProgressEvent, ProgressSink};
