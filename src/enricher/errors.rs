// Error types for the enrichment pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Per-item failure taxonomy.
///
/// Every kind is non-fatal to a `run` call: it ends up inside the item's
/// `FetchOutcome` so the caller can show it and decide about retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Identifier is empty or not a plausible URL / video ID
    InvalidInput,

    /// Item does not exist upstream (deleted, private, 404)
    NotFound,

    /// Item type is not handled (playlists, DRM, missing tooling)
    Unsupported,

    /// Upstream throttling (429, bot checks)
    RateLimited,

    /// Network hiccup, subprocess timeout, truncated output
    Transient,

    /// Hard timeout, either per request or the overall run deadline
    Timeout,

    /// DNS failure, refused connection, TLS failure
    ConnectionError,

    /// Unexpected HTTP status from a secondary lookup
    HttpStatus(u16),
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection_error",
            Self::HttpStatus(_) => "http_status",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "http_status({})", code),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Failure of a single fetch attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::NotFound, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Unsupported, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::RateLimited, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transient, message)
    }
}

/// Failure of an outbound HTTP call.
///
/// Expected failure states (4xx/5xx, timeout, DNS) all land here; the client
/// never panics on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        let message = err.to_string();
        let kind = match err {
            HttpError::Timeout(_) => FetchErrorKind::Timeout,
            HttpError::ConnectionError(_) => FetchErrorKind::ConnectionError,
            HttpError::Status(429) => FetchErrorKind::RateLimited,
            HttpError::Status(404) | HttpError::Status(410) => FetchErrorKind::NotFound,
            HttpError::Status(code) => FetchErrorKind::HttpStatus(code),
        };
        Self { kind, message }
    }
}

/// Contract violations reported before any work is dispatched
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("max_parallelism must be at least 1, got {0}")]
    InvalidParallelism(usize),

    #[error("overall timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
