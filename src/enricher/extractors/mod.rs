// Metadata fetchers built on yt-dlp
//
// Provides two flavours:
// - Python mode: `python3 -m yt_dlp` (better for YouTube, avoids bot detection)
// - CLI mode: native `yt-dlp` binary (faster, no Python dependency)
//
// AutoFetcher picks one per URL based on site and availability.

mod auto;
mod cli;
mod diagnostics;
mod parse;
mod python;
mod traits;

pub use auto::{AutoFetcher, FetcherStatus};
pub use cli::CliFetcher;
pub use diagnostics::{diagnose_error, error_from_stderr, FailureReason};
pub use parse::{normalize_timestamp, parse_metadata};
pub use python::PythonFetcher;
pub use traits::{ExtractorMode, FetcherConfig, MetadataFetcher};
