// Metadata resolvers
//
// - yt-dlp: YouTube videos and playlists (`--dump-json` / `-J --flat-playlist`)
// - spotdl: Spotify tracks, albums, playlists and artists (`spotdl save`)

mod spotdl;
mod traits;
mod ytdlp;

pub use spotdl::SpotDlResolver;
pub use traits::{ExtractorConfig, MetadataResolver};
pub use ytdlp::{parse_playlist_json, parse_video_json, YtDlpResolver};
