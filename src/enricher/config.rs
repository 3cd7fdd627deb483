// Pipeline configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::errors::PipelineError;
use super::extractors::FetcherConfig;
use super::language::ClassifierConfig;
use super::retry::RetryPolicy;

/// Hosts whose links are expanded over HTTP before fetching
pub const DEFAULT_SHORTENER_HOSTS: &[&str] =
    &["bit.ly", "t.co", "tinyurl.com", "goo.gl", "ow.ly", "buff.ly"];

/// Configuration for one `Orchestrator`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent worker slots (>= 1)
    pub max_parallelism: usize,
    /// Deadline for a whole `run` call
    #[serde(with = "serde_secs")]
    pub overall_timeout: Duration,
    /// Hard timeout for each HTTP request
    #[serde(with = "serde_secs")]
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub fetcher: FetcherConfig,
    pub shortener_hosts: Vec<String>,
    pub classifier: ClassifierConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 4,
            overall_timeout: Duration::from_secs(120),
            http_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            fetcher: FetcherConfig::default(),
            shortener_hosts: DEFAULT_SHORTENER_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `ENRICHER_*` environment variables
    pub fn from_env() -> Self {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = parse_var::<usize>(&lookup, "ENRICHER_MAX_PARALLELISM") {
            self.max_parallelism = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "ENRICHER_TIMEOUT_SECS") {
            self.overall_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "ENRICHER_HTTP_TIMEOUT_SECS") {
            self.http_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u32>(&lookup, "ENRICHER_MAX_ATTEMPTS") {
            self.retry.max_attempts = v;
        }
        if let Some(proxy) = lookup("ENRICHER_PROXY").filter(|p| !p.trim().is_empty()) {
            self.fetcher.proxy = Some(proxy);
        }
        self
    }

    pub fn with_max_parallelism(mut self, n: usize) -> Self {
        self.max_parallelism = n;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_shortener_hosts(mut self, hosts: Vec<String>) -> Self {
        self.shortener_hosts = hosts;
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_parallelism == 0 {
            return Err(PipelineError::InvalidParallelism(self.max_parallelism));
        }
        if self.overall_timeout.is_zero() {
            return Err(PipelineError::ZeroTimeout);
        }
        if self.http_timeout.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "http_timeout must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(PipelineError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_shortener(&self, host: &str) -> bool {
        let host = host.trim_start_matches("www.");
        self.shortener_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(host))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

/// Durations as (fractional) seconds in config files
pub(crate) mod serde_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
