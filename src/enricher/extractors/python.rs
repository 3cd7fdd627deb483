// Python fetcher - uses `python3 -m yt_dlp`
//
// Advantages:
// - Better at bypassing YouTube bot detection
// - Works well with cookies/auth
//
// Disadvantages:
// - Requires Python 3 and yt-dlp module
// - Slightly slower than native binary

use async_trait::async_trait;
use tracing::debug;

use super::diagnostics::error_from_stderr;
use super::parse::parse_metadata;
use super::traits::{FetcherConfig, MetadataFetcher};
use crate::enricher::errors::FetchError;
use crate::enricher::input::is_youtube_url;
use crate::enricher::models::VideoMetadata;
use crate::enricher::utils::{command_succeeds, run_output_with_timeout};

/// Python-based fetcher using the yt_dlp module
pub struct PythonFetcher {
    python_cmd: String,
    /// Probed once at construction so `fetch` never blocks on it
    available: bool,
}

impl PythonFetcher {
    pub fn new() -> Self {
        Self::with_interpreter(Self::find_python())
    }

    pub fn with_interpreter(python_cmd: impl Into<String>) -> Self {
        let python_cmd: String = python_cmd.into();
        let available = command_succeeds(&python_cmd, &["-c", "import yt_dlp"]);
        Self {
            python_cmd,
            available,
        }
    }

    /// Find Python interpreter
    fn find_python() -> String {
        // Allow override via environment variable
        if let Ok(custom) = std::env::var("YTDLP_PYTHON") {
            return custom;
        }

        let candidates = ["python3", "/opt/homebrew/bin/python3", "/usr/local/bin/python3"];

        candidates
            .iter()
            .find(|cmd| command_succeeds(cmd, &["--version"]))
            .map(|cmd| cmd.to_string())
            .unwrap_or_else(|| "python3".to_string())
    }

    fn build_args(&self, url: &str, config: &FetcherConfig) -> Vec<String> {
        let mut args = vec!["-m".to_string(), "yt_dlp".to_string()];
        args.extend(config.ytdlp_args(url, is_youtube_url(url)));
        args
    }
}

impl Default for PythonFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for PythonFetcher {
    fn name(&self) -> &'static str {
        "python-yt-dlp"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn fetch(&self, url: &str, config: &FetcherConfig) -> Result<VideoMetadata, FetchError> {
        if !self.is_available() {
            return Err(FetchError::unsupported("Python yt_dlp module not installed"));
        }

        let args = self.build_args(url, config);
        debug!(fetcher = self.name(), "Running: {} {}", self.python_cmd, args.join(" "));

        let output =
            run_output_with_timeout(&self.python_cmd, args, config.timeout_seconds as u64).await?;

        if !output.status.success() {
            return Err(error_from_stderr(&String::from_utf8_lossy(&output.stderr)));
        }

        parse_metadata(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_run_module() {
        let fetcher = PythonFetcher::with_interpreter("python3");
        let args = fetcher.build_args("https://vimeo.com/1", &FetcherConfig::default());
        assert_eq!(&args[..2], &["-m".to_string(), "yt_dlp".to_string()]);
        assert_eq!(args.last().map(String::as_str), Some("https://vimeo.com/1"));
    }

    #[test]
    fn test_missing_interpreter_unavailable() {
        let fetcher = PythonFetcher::with_interpreter("/nonexistent/python3");
        assert!(!fetcher.is_available());
    }
}
