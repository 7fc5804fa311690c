// Failure diagnostics - identifies why an external tool refused a download
//
// yt-dlp and spotdl only report failures as free text on stderr. The reason
// found here is folded into the EngineFailure message; it never changes the
// error kind.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// DRM, Premium-only or paid content
    DrmProtected,

    /// Sign-in required to confirm age
    AgeRestricted,

    /// Private video requiring authorization
    PrivateVideo,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// Geographic restriction
    GeoBlocked,

    /// 429 or similar
    RateLimited,

    /// Captcha / "confirm you're not a bot"
    BotDetection,

    /// HTTP 403 without a more specific cause
    Http403Forbidden,

    /// spotdl found no matching audio source for the track
    NoMatch,

    /// Post-processing needs ffmpeg and it is missing
    FfmpegMissing,

    /// Socket timeout or unreachable network
    NetworkTimeout,
}

impl BlockingReason {
    /// Check if this is a permanent restriction (retrying will not help)
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::PrivateVideo | Self::NoMatch
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::DrmProtected => "DRM-protected content",
            Self::AgeRestricted => "Age-restricted content",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by provider",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::NoMatch => "No matching audio source found",
            Self::FfmpegMissing => "ffmpeg is required but not installed",
            Self::NetworkTimeout => "Network timeout",
        }
    }
}

/// Analyze error output and return the most specific blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    // Checked in order of specificity
    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("youtube premium")
        || lower.contains("requires purchase")
        || lower.contains("this video requires payment")
    {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("sign in if you've been granted access")
    {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
        || lower.contains("video is unavailable")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restriction")
        || lower.contains("geo-restricted")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("not a bot") || lower.contains("captcha") || lower.contains("unusual traffic") {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("lookuperror") || lower.contains("no results found") {
        return Some(BlockingReason::NoMatch);
    }

    if lower.contains("ffmpeg not found")
        || lower.contains("ffprobe and ffmpeg not found")
        || lower.contains("ffmpeg is not installed")
    {
        return Some(BlockingReason::FfmpegMissing);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_403_detection() {
        let error = "ERROR: unable to download video data: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(BlockingReason::Http403Forbidden));
    }

    #[test]
    fn test_age_restricted_detection() {
        let error = "ERROR: [youtube] xyz: Sign in to confirm your age";
        assert_eq!(diagnose_error(error), Some(BlockingReason::AgeRestricted));
    }

    #[test]
    fn test_spotdl_lookup_detection() {
        let error = "LookupError: No results found for song: Artist - Title";
        assert_eq!(diagnose_error(error), Some(BlockingReason::NoMatch));
    }

    #[test]
    fn test_ffmpeg_detection() {
        let error = "ERROR: Postprocessing: ffprobe and ffmpeg not found. Please install or provide the path";
        assert_eq!(diagnose_error(error), Some(BlockingReason::FfmpegMissing));
    }

    #[test]
    fn test_timeout_detection() {
        let error = "ERROR: Unable to download webpage: The read operation timed out";
        assert_eq!(diagnose_error(error), Some(BlockingReason::NetworkTimeout));
    }

    #[test]
    fn test_plain_words_do_not_match() {
        assert_eq!(diagnose_error("George and both bottles"), None);
        assert_eq!(diagnose_error(""), None);
    }

    #[test]
    fn test_permanent_reasons() {
        assert!(BlockingReason::DrmProtected.is_permanent());
        assert!(BlockingReason::NoMatch.is_permanent());
        assert!(!BlockingReason::RateLimited.is_permanent());
    }
}
