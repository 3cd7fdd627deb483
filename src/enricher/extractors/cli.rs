// CLI fetcher - uses native `yt-dlp` binary
//
// Advantages:
// - Faster than Python mode
// - No Python dependency
//
// Disadvantages:
// - More likely to trigger YouTube bot detection

use async_trait::async_trait;
use tracing::debug;

use super::diagnostics::error_from_stderr;
use super::parse::parse_metadata;
use super::traits::{FetcherConfig, MetadataFetcher};
use crate::enricher::errors::FetchError;
use crate::enricher::input::is_youtube_url;
use crate::enricher::models::VideoMetadata;
use crate::enricher::utils::{command_succeeds, run_output_with_timeout};

/// CLI-based fetcher using the yt-dlp binary
pub struct CliFetcher {
    ytdlp_path: String,
    /// Probed once at construction so `fetch` never blocks on it
    available: bool,
}

impl CliFetcher {
    pub fn new() -> Self {
        Self::with_path(Self::find_ytdlp())
    }

    pub fn with_path(path: impl Into<String>) -> Self {
        let ytdlp_path: String = path.into();
        let available = command_succeeds(&ytdlp_path, &["--version"]);
        Self {
            ytdlp_path,
            available,
        }
    }

    /// Find yt-dlp binary
    fn find_ytdlp() -> String {
        if let Ok(custom) = std::env::var("YTDLP_PATH") {
            return custom;
        }

        let common_paths = [
            "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
            "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
            "/usr/bin/yt-dlp",          // System installation
        ];

        common_paths
            .iter()
            .find(|path| std::path::Path::new(path).exists())
            .map(|path| path.to_string())
            .unwrap_or_else(|| "yt-dlp".to_string())
    }
}

impl Default for CliFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for CliFetcher {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn fetch(&self, url: &str, config: &FetcherConfig) -> Result<VideoMetadata, FetchError> {
        if !self.is_available() {
            return Err(FetchError::unsupported("yt-dlp binary not found"));
        }

        let args = config.ytdlp_args(url, is_youtube_url(url));
        debug!(fetcher = self.name(), "Running: {} {}", self.ytdlp_path, args.join(" "));

        let output =
            run_output_with_timeout(&self.ytdlp_path, args, config.timeout_seconds as u64).await?;

        if !output.status.success() {
            return Err(error_from_stderr(&String::from_utf8_lossy(&output.stderr)));
        }

        parse_metadata(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enricher::errors::FetchErrorKind;

    #[tokio::test]
    async fn test_missing_binary_is_unsupported() {
        let fetcher = CliFetcher::with_path("/nonexistent/yt-dlp");
        assert!(!fetcher.is_available());
        let err = fetcher
            .fetch("https://vimeo.com/1", &FetcherConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Unsupported);
    }

    #[cfg(unix)]
    #[test]
    fn test_availability_is_known_after_construction() {
        // `true` accepts any arguments and exits 0
        let fetcher = CliFetcher::with_path("true");
        assert!(fetcher.is_available());
    }
}
