// Failure diagnostics - turns yt-dlp stderr into a failure kind
//
// Patterns are checked in order of specificity: permanent restrictions first,
// then throttling, then generic network trouble.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::enricher::errors::{FetchError, FetchErrorKind};

/// Why yt-dlp refused or failed to return metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// URL not handled by any yt-dlp extractor
    UnsupportedUrl,

    /// Playlist / channel rather than a single item
    Playlist,

    /// DRM, Premium, purchase or rental
    DrmProtected,

    /// Requires channel membership
    MembersOnly,

    /// Age gate requiring login
    AgeRestricted,

    /// Geographic restriction
    GeoBlocked,

    /// Private video requiring authorization
    PrivateVideo,

    /// Deleted, removed, or never existed
    VideoUnavailable,

    /// 429 or explicit rate limiting
    RateLimited,

    /// Captcha / "confirm you're not a bot"
    BotDetection,

    /// HTTP 403 without a more specific cause
    Http403Forbidden,

    /// Socket timeout, refused connection, DNS
    NetworkTimeout,

    /// Upstream 5xx
    ServerError,

    /// Nothing recognizable
    Unknown,
}

impl FailureReason {
    /// Failure kind the orchestrator sees for this reason
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::UnsupportedUrl
            | Self::Playlist
            | Self::DrmProtected
            | Self::MembersOnly
            | Self::AgeRestricted
            | Self::GeoBlocked => FetchErrorKind::Unsupported,
            Self::PrivateVideo | Self::VideoUnavailable => FetchErrorKind::NotFound,
            Self::RateLimited | Self::BotDetection => FetchErrorKind::RateLimited,
            Self::Http403Forbidden
            | Self::NetworkTimeout
            | Self::ServerError
            | Self::Unknown => FetchErrorKind::Transient,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnsupportedUrl => "URL not supported by yt-dlp",
            Self::Playlist => "Playlists are not supported",
            Self::DrmProtected => "DRM-protected or paid content",
            Self::MembersOnly => "Members-only content",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::RateLimited => "Rate limited by upstream",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTimeout => "Network timeout",
            Self::ServerError => "Upstream server error",
            Self::Unknown => "Unknown extraction failure",
        }
    }
}

lazy_static! {
    // Status codes only count when yt-dlp reports them as HTTP statuses,
    // never as digits inside an echoed video ID
    static ref HTTP_429_RE: Regex = Regex::new(r"(?:http error|status(?: code)?)\s*:?\s*429\b").unwrap();
    static ref HTTP_403_RE: Regex = Regex::new(r"(?:http error|status(?: code)?)\s*:?\s*403\b").unwrap();
}

/// Analyze an error message and return the failure reason
pub fn diagnose_error(error: &str) -> FailureReason {
    let lower = error.to_lowercase();

    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return FailureReason::UnsupportedUrl;
    }

    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("youtube premium")
        || lower.contains("requires purchase")
        || lower.contains("rental")
        || lower.contains("requires payment")
    {
        return FailureReason::DrmProtected;
    }

    if lower.contains("members only")
        || lower.contains("members-only")
        || lower.contains("join this channel")
        || lower.contains("available to members")
    {
        return FailureReason::MembersOnly;
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return FailureReason::AgeRestricted;
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("sign in if you've been granted access")
    {
        return FailureReason::PrivateVideo;
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("no longer available")
        || lower.contains("video is unavailable")
        || lower.contains("does not exist")
        || lower.contains("http error 404")
        || lower.contains("404: not found")
    {
        return FailureReason::VideoUnavailable;
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restriction")
        || lower.contains("geo-restricted")
    {
        return FailureReason::GeoBlocked;
    }

    if HTTP_429_RE.is_match(&lower)
        || lower.contains("rate limit") || lower.contains("too many requests") {
        return FailureReason::RateLimited;
    }

    if lower.contains("not a bot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
    {
        return FailureReason::BotDetection;
    }

    if HTTP_403_RE.is_match(&lower) || lower.contains("forbidden") {
        return FailureReason::Http403Forbidden;
    }

    if lower.contains("http error 5")
        || lower.contains("internal server error")
        || lower.contains("service unavailable")
        || lower.contains("bad gateway")
    {
        return FailureReason::ServerError;
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("network unreachable")
        || lower.contains("name resolution")
        || lower.contains("getaddrinfo")
    {
        return FailureReason::NetworkTimeout;
    }

    FailureReason::Unknown
}

/// First line worth showing to a user: an "ERROR:" line if present,
/// otherwise the first non-empty line.
pub fn extract_context(error: &str) -> Option<String> {
    let mut lines = error.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.clone().next()?;
    let line = lines
        .find(|l| l.to_lowercase().starts_with("error:"))
        .unwrap_or(first);
    Some(line.to_string())
}

/// Build a `FetchError` from yt-dlp stderr
pub fn error_from_stderr(stderr: &str) -> FetchError {
    let reason = diagnose_error(stderr);
    let message = match extract_context(stderr) {
        Some(context) => format!("{}: {}", reason.description(), context),
        None => reason.description().to_string(),
    };
    FetchError::new(reason.kind(), message)
}
