// Output formats, audio quality and display formatting
//
// Every format the UI can offer maps to:
// - the engine arguments used to produce it (yt-dlp selector / audio codec)
// - the extension the Artifact Locator scans for, plus fallbacks
//
// Unknown strings coming from a form are normalized to the provider's default
// (`normalize`); `FromStr` is the strict variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DownloadError;
use super::models::Provider;

/// Extensions an engine may pick when asked for a video container
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];

/// Extensions an engine may pick when asked for audio
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "flac", "opus", "ogg", "wav"];

pub const PLAYBACK_SPEEDS: [f64; 5] = [1.0, 1.25, 1.5, 1.75, 2.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    /// Audio stream extension that muxes cleanly into this container
    fn audio_pair(&self) -> &'static str {
        match self {
            Self::Mp4 => "m4a",
            Self::Webm => "webm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoFormat {
    /// Best stream at or below `height`, restricted to one container
    Capped { container: Container, height: u32 },
    /// Best available video + audio, merged to mp4
    Best,
}

impl VideoFormat {
    /// Every video format offered, in UI order
    pub const ALL: [VideoFormat; 7] = [
        Self::Capped { container: Container::Mp4, height: 1080 },
        Self::Capped { container: Container::Mp4, height: 720 },
        Self::Capped { container: Container::Mp4, height: 480 },
        Self::Capped { container: Container::Mp4, height: 360 },
        Self::Capped { container: Container::Webm, height: 1080 },
        Self::Capped { container: Container::Webm, height: 720 },
        Self::Best,
    ];

    pub fn container(&self) -> Container {
        match self {
            Self::Capped { container, .. } => *container,
            Self::Best => Container::Mp4,
        }
    }

    /// yt-dlp `-f` selector
    pub fn selector(&self) -> String {
        match self {
            Self::Capped { container, height } => {
                let ext = container.extension();
                let audio = container.audio_pair();
                format!(
                    "bestvideo[height<={h}][ext={ext}]+bestaudio[ext={audio}]/best[height<={h}][ext={ext}]/best",
                    h = height,
                    ext = ext,
                    audio = audio
                )
            }
            Self::Best => "bestvideo+bestaudio/best".to_string(),
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Capped { container, height } => {
                format!("{}_{}p", container.extension(), height)
            }
            Self::Best => "best".to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Capped { container, height } => {
                let name = match container {
                    Container::Mp4 => "MP4",
                    Container::Webm => "WebM",
                };
                let tier = match (container, height) {
                    (Container::Mp4, 1080) => " (Full HD)",
                    (Container::Mp4, 720) => " (HD)",
                    (Container::Mp4, 480) => " (SD)",
                    (Container::Mp4, 360) => " (Low)",
                    _ => "",
                };
                format!("{} - {}p{}", name, height, tier)
            }
            Self::Best => "Best Available Quality".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Aac,
    Wav,
    Flac,
    M4a,
    Opus,
    Ogg,
}

impl AudioFormat {
    pub const YOUTUBE: [AudioFormat; 5] = [Self::Mp3, Self::Aac, Self::Wav, Self::Flac, Self::M4a];
    pub const SPOTIFY: [AudioFormat; 6] = [
        Self::Mp3,
        Self::M4a,
        Self::Flac,
        Self::Opus,
        Self::Ogg,
        Self::Wav,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac => "aac",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::M4a => "m4a",
            Self::Opus => "opus",
            Self::Ogg => "ogg",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Wav | Self::Flac)
    }

    pub fn label(&self) -> String {
        let name = self.extension().to_uppercase();
        if self.is_lossless() {
            format!("{} (Lossless)", name)
        } else {
            name
        }
    }

    pub fn supported_by(&self, provider: Provider) -> bool {
        match provider {
            Provider::YouTube => Self::YOUTUBE.contains(self),
            Provider::Spotify => Self::SPOTIFY.contains(self),
        }
    }
}

/// Output format chosen for a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "format", rename_all = "lowercase")]
pub enum OutputFormat {
    Video(VideoFormat),
    Audio(AudioFormat),
}

impl OutputFormat {
    /// Form value, e.g. "mp4_720p" or "flac"
    pub fn key(&self) -> String {
        match self {
            Self::Video(v) => v.key(),
            Self::Audio(a) => a.extension().to_string(),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio(_))
    }

    /// Extension the produced artifact should carry
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Video(v) => v.container().extension(),
            Self::Audio(a) => a.extension(),
        }
    }

    /// Extensions accepted when the engine picked a different container
    pub fn alternatives(&self) -> &'static [&'static str] {
        match self {
            Self::Video(_) => VIDEO_EXTENSIONS,
            Self::Audio(_) => AUDIO_EXTENSIONS,
        }
    }

    pub fn default_for(provider: Provider) -> Self {
        match provider {
            Provider::YouTube => Self::Video(VideoFormat::Best),
            Provider::Spotify => Self::Audio(AudioFormat::Mp3),
        }
    }

    pub fn supported_by(&self, provider: Provider) -> bool {
        match (self, provider) {
            (Self::Video(_), Provider::YouTube) => true,
            (Self::Video(_), Provider::Spotify) => false,
            (Self::Audio(a), p) => a.supported_by(p),
        }
    }

    /// Permissive parse: anything unknown or unsupported by `provider`
    /// becomes the provider's default.
    pub fn normalize(provider: Provider, raw: &str) -> Self {
        match raw.parse::<OutputFormat>() {
            Ok(format) if format.supported_by(provider) => format,
            _ => {
                let fallback = Self::default_for(provider);
                tracing::warn!(
                    "Unsupported {} format '{}', using '{}'",
                    provider,
                    raw,
                    fallback.key()
                );
                fallback
            }
        }
    }

    /// Form options for a provider, in UI order
    pub fn options_for(provider: Provider) -> Vec<FormatOption> {
        let mut options = Vec::new();
        if provider == Provider::YouTube {
            for v in VideoFormat::ALL {
                options.push(FormatOption {
                    value: v.key(),
                    label: v.label(),
                    is_audio: false,
                });
            }
        }

        let audio: &[AudioFormat] = match provider {
            Provider::YouTube => &AudioFormat::YOUTUBE,
            Provider::Spotify => &AudioFormat::SPOTIFY,
        };
        for a in audio {
            let label = match (provider, a.is_lossless()) {
                (Provider::YouTube, false) => format!("{} (192kbps)", a.label()),
                _ => a.label(),
            };
            options.push(FormatOption {
                value: a.extension().to_string(),
                label,
                is_audio: true,
            });
        }
        options
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for OutputFormat {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();

        for a in AudioFormat::SPOTIFY.iter().chain(AudioFormat::YOUTUBE.iter()) {
            if a.extension() == key {
                return Ok(Self::Audio(*a));
            }
        }

        VideoFormat::ALL
            .iter()
            .find(|v| v.key() == key)
            .map(|v| Self::Video(*v))
            .ok_or_else(|| DownloadError::InvalidFormat {
                what: "output format",
                value: s.to_string(),
            })
    }
}

/// UI-friendly format choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub value: String,
    pub label: String,
    pub is_audio: bool,
}

/// Audio bitrate in kbps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AudioQuality(u16);

impl AudioQuality {
    pub const ALLOWED_KBPS: [u16; 12] = [8, 16, 24, 32, 48, 64, 96, 128, 160, 192, 256, 320];

    pub fn from_kbps(kbps: u16) -> Result<Self, DownloadError> {
        if Self::ALLOWED_KBPS.contains(&kbps) {
            Ok(Self(kbps))
        } else {
            Err(DownloadError::InvalidFormat {
                what: "audio quality",
                value: format!("{}k", kbps),
            })
        }
    }

    pub fn kbps(&self) -> u16 {
        self.0
    }

    /// Lossy default for YouTube audio extraction
    pub fn youtube_default() -> Self {
        Self(192)
    }

    /// Permissive parse, falling back to the default bitrate
    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Unsupported audio quality '{}', using 320k", raw);
            Self::default()
        })
    }

    pub fn all() -> Vec<AudioQuality> {
        Self::ALLOWED_KBPS.iter().map(|k| Self(*k)).collect()
    }
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self(320)
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.0)
    }
}

impl FromStr for AudioQuality {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let digits = trimmed.strip_suffix('k').unwrap_or(&trimmed);
        let invalid = || DownloadError::InvalidFormat {
            what: "audio quality",
            value: s.to_string(),
        };
        let kbps: u16 = digits.parse().map_err(|_| invalid())?;
        Self::from_kbps(kbps).map_err(|_| invalid())
    }
}

/// Human-readable duration; 0 means unknown
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "Unknown".to_string();
    }

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, secs)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Same as [`format_duration`] for Spotify's millisecond durations.
/// Sub-second non-zero values render as "0s", not "Unknown".
pub fn format_duration_ms(ms: u64) -> String {
    if ms == 0 {
        return "Unknown".to_string();
    }
    let seconds = ms / 1000;
    if seconds == 0 {
        return "0s".to_string();
    }
    format_duration(seconds)
}

/// Listening time at each of [`PLAYBACK_SPEEDS`]
pub fn duration_at_speeds(seconds: u64) -> Vec<(f64, String)> {
    PLAYBACK_SPEEDS
        .iter()
        .map(|speed| {
            let adjusted = (seconds as f64 / speed) as u64;
            (*speed, format_duration(adjusted))
        })
        .collect()
}
