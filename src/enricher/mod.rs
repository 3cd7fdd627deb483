// Enricher module - concurrent video metadata enrichment pipeline

pub mod config;
pub mod errors;
pub mod extractors;
pub mod filter;
pub mod http;
pub mod input;
pub mod language;
pub mod models;
pub mod orchestrator;
pub mod retry;
mod utils;

pub use config::PipelineConfig;
pub use errors::{FetchError, FetchErrorKind, HttpError, PipelineError};
pub use extractors::{AutoFetcher, ExtractorMode, FetcherConfig, MetadataFetcher};
pub use filter::ResultFilter;
pub use http::{HttpClient, ReqwestHttpClient};
pub use language::{ClassifierConfig, LanguageClassifier};
pub use models::{
    FetchFailure, FetchOutcome, InputItem, ItemHint, LanguageCode, MetadataRecord, ResultSet,
    RunSummary, VideoMetadata,
};
pub use orchestrator::Orchestrator;
pub use retry::RetryPolicy;
