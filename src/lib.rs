pub mod enricher;

use std::time::Duration;

pub use enricher::{
    FetchError, FetchErrorKind, FetchFailure, FetchOutcome, InputItem, ItemHint, LanguageCode,
    MetadataRecord, Orchestrator, PipelineConfig, PipelineError, ResultFilter, ResultSet,
};

/// Fetch and classify `items` with yt-dlp, blocking until the `ResultSet` is
/// ready or `overall_timeout` elapses.
///
/// Settings other than parallelism and timeout come from
/// `PipelineConfig::from_env`. Must not be called from inside a tokio runtime;
/// async callers use `Orchestrator::run` directly.
pub fn run(
    items: &[InputItem],
    max_parallelism: usize,
    overall_timeout: Duration,
) -> Result<ResultSet, PipelineError> {
    let config = PipelineConfig::from_env()
        .with_max_parallelism(max_parallelism)
        .with_overall_timeout(overall_timeout);
    let orchestrator = Orchestrator::with_defaults(config)?;
    orchestrator.run_blocking(items, max_parallelism, overall_timeout)
}
