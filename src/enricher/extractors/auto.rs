// Auto fetcher - picks Python or CLI yt-dlp per URL
//
// Strategy:
// 1. For YouTube: Python mode preferred (better anti-bot bypass)
// 2. For other sites: CLI mode preferred (faster)
// 3. Fall back only when the preferred tool is not installed, so one fetch
//    is still one outbound operation

use async_trait::async_trait;
use tracing::debug;

use super::cli::CliFetcher;
use super::python::PythonFetcher;
use super::traits::{ExtractorMode, FetcherConfig, MetadataFetcher};
use crate::enricher::errors::FetchError;
use crate::enricher::input::is_youtube_url;
use crate::enricher::models::VideoMetadata;

/// Fetcher that manages the Python and CLI flavours
pub struct AutoFetcher {
    python: Box<dyn MetadataFetcher>,
    cli: Box<dyn MetadataFetcher>,
}

impl AutoFetcher {
    pub fn new() -> Self {
        Self::with_fetchers(Box::new(PythonFetcher::new()), Box::new(CliFetcher::new()))
    }

    pub fn with_fetchers(python: Box<dyn MetadataFetcher>, cli: Box<dyn MetadataFetcher>) -> Self {
        Self { python, cli }
    }

    /// Fetcher to use for `url` under `mode`, or None if nothing is installed
    fn select(&self, url: &str, mode: ExtractorMode) -> Option<&dyn MetadataFetcher> {
        let (primary, fallback): (&dyn MetadataFetcher, &dyn MetadataFetcher) = match mode {
            ExtractorMode::Python => return Some(self.python.as_ref()),
            ExtractorMode::Cli => return Some(self.cli.as_ref()),
            ExtractorMode::Auto if is_youtube_url(url) => (self.python.as_ref(), self.cli.as_ref()),
            ExtractorMode::Auto => (self.cli.as_ref(), self.python.as_ref()),
        };

        if primary.is_available() {
            Some(primary)
        } else if fallback.is_available() {
            debug!(
                primary = primary.name(),
                fallback = fallback.name(),
                "Preferred fetcher unavailable, using fallback"
            );
            Some(fallback)
        } else {
            None
        }
    }

    pub fn status(&self) -> FetcherStatus {
        FetcherStatus {
            python_available: self.python.is_available(),
            cli_available: self.cli.is_available(),
        }
    }
}

impl Default for AutoFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for AutoFetcher {
    fn name(&self) -> &'static str {
        "auto-yt-dlp"
    }

    fn is_available(&self) -> bool {
        self.python.is_available() || self.cli.is_available()
    }

    async fn fetch(&self, url: &str, config: &FetcherConfig) -> Result<VideoMetadata, FetchError> {
        match self.select(url, config.mode) {
            Some(fetcher) => fetcher.fetch(url, config).await,
            None => Err(FetchError::unsupported(
                "Neither Python yt_dlp nor yt-dlp binary available",
            )),
        }
    }
}

/// Which yt-dlp flavours are installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherStatus {
    pub python_available: bool,
    pub cli_available: bool,
}
