//! Replay client implementation

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::capture::{CapturedRequest, PostData};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Headers the browser attached that must not be replayed verbatim:
/// reqwest computes these itself.
const SKIP_HEADERS: &[&str] = &["host", "content-length", "accept-encoding", "connection"];

/// Configuration for the replay client
#[derive(Debug, Clone)]
pub struct ReplayClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of transport-level retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for ReplayClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("apiscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Response of a replayed request
#[derive(Debug, Clone)]
pub struct ReplayResponse {
    /// HTTP status code (always 2xx; other codes surface as errors)
    pub status: u16,
    /// Response body text
    pub text: String,
}

/// HTTP client that re-issues captured requests
pub struct ReplayClient {
    client: Client,
    config: ReplayClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl ReplayClient {
    /// Create a replay client with default configuration
    pub fn new() -> Self {
        Self::with_config(ReplayClientConfig::default())
    }

    /// Create a replay client with custom configuration
    pub fn with_config(config: ReplayClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Self {
            client,
            config,
            rate_limiter,
        }
    }

    /// Re-issue a captured (already parameterized) request.
    ///
    /// Returns the body text on 2xx. Any other status raises
    /// [`Error::HttpStatus`] carrying the code; transport failures and
    /// retryable server statuses are retried first.
    pub async fn send(&self, request: &CapturedRequest) -> Result<ReplayResponse> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;
        let mut attempt = 0;

        while attempt <= max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let req = self.build_request(request)?;

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS && attempt < max_retries {
                        let retry_after = extract_retry_after(&response);
                        warn!(
                            "Rate limited (429), attempt {}/{}, waiting {}s",
                            attempt + 1,
                            max_retries + 1,
                            retry_after
                        );
                        tokio::time::sleep(Duration::from_secs(retry_after)).await;
                        attempt += 1;
                        last_error = Some(Error::http_status(429, String::new()));
                        continue;
                    }

                    if is_retryable_status(status) && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Replay failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::http_status(status.as_u16(), String::new()));
                        continue;
                    }

                    let code = status.as_u16();
                    let text = response.text().await.unwrap_or_default();

                    if !(200..300).contains(&code) {
                        return Err(Error::http_status(code, text));
                    }

                    debug!("Replay succeeded: {} {}", request.method, request.url);
                    return Ok(ReplayResponse { status: code, text });
                }
                Err(e) => {
                    if e.is_timeout() {
                        if attempt < max_retries {
                            let delay = self.calculate_backoff(attempt);
                            warn!(
                                "Replay timeout, attempt {}/{}, retrying in {:?}",
                                attempt + 1,
                                max_retries + 1,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            last_error = Some(Error::Timeout {
                                timeout_ms: self.config.timeout.as_millis() as u64,
                            });
                            continue;
                        }
                        return Err(Error::Timeout {
                            timeout_ms: self.config.timeout.as_millis() as u64,
                        });
                    }

                    if e.is_connect() && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Connection error, attempt {}/{}, retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::Http(e));
                        continue;
                    }

                    return Err(Error::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }

    /// Assemble the reqwest request from a captured one
    fn build_request(&self, request: &CapturedRequest) -> Result<reqwest::RequestBuilder> {
        let mut req = self
            .client
            .request(request.method.into(), &request.url)
            .timeout(self.config.timeout);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        for (key, value) in &request.headers {
            if SKIP_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
                continue;
            }
            req = req.header(key.as_str(), value.as_str());
        }

        if !request.queries.is_empty() {
            req = req.query(&request.queries);
        }

        match &request.post_data {
            Some(PostData::Structured(value)) => {
                req = req.json(value);
            }
            Some(PostData::Raw(raw)) => {
                req = req.body(raw.clone());
            }
            None => {}
        }

        Ok(req)
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff * factor
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl Default for ReplayClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReplayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Check if an HTTP status is retryable
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524)
}

/// Extract retry-after header value
fn extract_retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
