// Download engines backed by external tools

pub mod spotdl;
pub mod ytdlp;

pub use spotdl::SpotDlEngine;
pub use ytdlp::YtDlpEngine;
