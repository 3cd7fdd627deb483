// HTTP enrichment client for secondary lookups (short-link expansion and the like)

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

use super::errors::{HttpError, PipelineError};

const USER_AGENT: &str = concat!("video-enricher/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// Outbound HTTP with a hard per-call timeout.
///
/// Expected failures (status codes, timeouts, DNS) come back as `HttpError`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the body of a 2xx response
    async fn get(&self, url: &str, timeout: Duration) -> Result<Bytes, HttpError>;

    /// Follow redirects from `url` and return the final URL
    async fn resolve(&self, url: &str, timeout: Duration) -> Result<String, HttpError>;
}

/// `HttpClient` on top of reqwest.
///
/// Idle connections are not kept, so nothing outlives the request that
/// opened it.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(proxy: Option<&str>) -> Result<Self, PipelineError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .pool_max_idle_per_host(0);

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                PipelineError::InvalidConfig(format!("invalid proxy URL {}: {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str, timeout: Duration) -> Result<reqwest::Response, HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "HTTP request returned error status");
            return Err(HttpError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Bytes, HttpError> {
        let request = async {
            let response = self.send(url, timeout).await?;
            response
                .bytes()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| HttpError::Timeout(timeout))?
    }

    async fn resolve(&self, url: &str, timeout: Duration) -> Result<String, HttpError> {
        let request = async {
            let response = self.send(url, timeout).await?;
            Ok(response.url().to_string())
        };

        let resolved = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| HttpError::Timeout(timeout))??;

        debug!(from = url, to = %resolved, "Resolved redirect chain");
        Ok(resolved)
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(timeout)
    } else if let Some(status) = err.status() {
        HttpError::Status(status.as_u16())
    } else {
        HttpError::ConnectionError(err.to_string())
    }
}
