//! Resilient feed fetcher
//!
//! Wraps calls to the dayfeed server with bounded retries. Failures are
//! classified so the caller knows whether waiting could help:
//!
//! | Kind                 | Retried | Typical cause                          |
//! |----------------------|---------|----------------------------------------|
//! | `Timeout`            | yes     | slow network, server busy              |
//! | `NetworkError`       | yes     | connection refused, 5xx                |
//! | `Unauthorized`       | no      | wrong shared secret, clock skew        |
//! | `MalformedResponse`  | no      | HTML login page, wrong URL             |
//! | `EmptyResponse`      | no      | proxy swallowed the body               |
//! | `MaxRetriesExceeded` | -       | retryable failures on every attempt    |
//!
//! Backoff between attempts doubles from the base delay (1 s by default).

use dayfeed_common::api::{
    calculate_hash, query_params_to_json, sign_value, AcknowledgeRequest, AcknowledgeResponse,
    FeedResponse,
};
use dayfeed_common::time::now_millis;
use reqwest::{header, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("dayfeed-client/", env!("CARGO_PKG_VERSION"));

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    NetworkError,
    Unauthorized,
    MalformedResponse,
    EmptyResponse,
    MaxRetriesExceeded,
}

impl ErrorKind {
    /// Only transport-level failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::NetworkError)
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Timeout => 2,
            ErrorKind::NetworkError => 3,
            ErrorKind::Unauthorized => 4,
            ErrorKind::MalformedResponse => 5,
            ErrorKind::EmptyResponse => 6,
            ErrorKind::MaxRetriesExceeded => 7,
        }
    }
}

/// Fetch error with its classification
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Empty response from server")]
    Empty,

    #[error("Gave up after {attempts} attempts, last error: {last}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout(_) => ErrorKind::Timeout,
            FetchError::Network(_) => ErrorKind::NetworkError,
            FetchError::Unauthorized(_) => ErrorKind::Unauthorized,
            FetchError::Malformed(_) => ErrorKind::MalformedResponse,
            FetchError::Empty => ErrorKind::EmptyResponse,
            FetchError::MaxRetriesExceeded { .. } => ErrorKind::MaxRetriesExceeded,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Server root, e.g. `http://192.168.1.20:5740`
    pub base_url: String,
    /// 0 sends unsigned requests
    pub shared_secret: i64,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Delay after the first failed attempt; doubles each time
    pub base_backoff: Duration,
}

impl FetcherConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            shared_secret: 0,
            timeout: Duration::from_secs(10),
            base_backoff: Duration::from_secs(1),
        }
    }
}

pub struct ResilientFetcher {
    http_client: reqwest::Client,
    config: FetcherConfig,
}

impl ResilientFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("HTTP client build failed: {}", e)))?;

        let config = FetcherConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Fetch today's feed, attempting at most `max_retries` times
    pub async fn fetch(&self, client_id: &str, max_retries: u32) -> Result<FeedResponse, FetchError> {
        self.with_retries("feed", max_retries, || self.fetch_once(client_id))
            .await
    }

    /// Confirm a task, attempting at most `max_retries` times
    ///
    /// Safe to retry: the server ignores repeated confirmations. Each
    /// attempt is signed with a fresh timestamp.
    pub async fn acknowledge(
        &self,
        request: &AcknowledgeRequest,
        max_retries: u32,
    ) -> Result<AcknowledgeResponse, FetchError> {
        self.with_retries("acknowledge", max_retries, || self.acknowledge_once(request))
            .await
    }

    async fn with_retries<F, Fut, T>(
        &self,
        operation: &str,
        max_retries: u32,
        mut attempt_fn: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = max_retries.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let err = match attempt_fn().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.kind().is_retryable() {
                warn!(operation, attempt, kind = ?err.kind(), "Request failed, not retrying: {}", err);
                return Err(err);
            }

            if attempt >= attempts {
                warn!(operation, attempt, "Request failed, retries exhausted: {}", err);
                return Err(FetchError::MaxRetriesExceeded {
                    attempts,
                    last: Box::new(err),
                });
            }

            let backoff = self.backoff_for(attempt);
            warn!(
                operation,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "Request failed, will retry after backoff: {}",
                err
            );
            tokio::time::sleep(backoff).await;
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.config.base_backoff.saturating_mul(factor)
    }

    async fn fetch_once(&self, client_id: &str) -> Result<FeedResponse, FetchError> {
        let timestamp = now_millis().to_string();
        let mut params = vec![
            ("clientId".to_string(), client_id.to_string()),
            ("timestamp".to_string(), timestamp),
        ];
        if self.config.shared_secret != 0 {
            let value = query_params_to_json(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            params.push(("hash".to_string(), calculate_hash(&value, self.config.shared_secret)));
        }

        debug!(client_id = %client_id, "Fetching feed");

        let response = self
            .http_client
            .get(format!("{}/feed", self.config.base_url))
            .query(&params)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let body = read_body(response).await?;
        serde_json::from_value(body)
            .map_err(|e| FetchError::Malformed(format!("Unexpected feed shape: {}", e)))
    }

    async fn acknowledge_once(
        &self,
        request: &AcknowledgeRequest,
    ) -> Result<AcknowledgeResponse, FetchError> {
        let mut fresh = request.clone();
        fresh.timestamp = now_millis();
        fresh.hash = None;

        let mut body = serde_json::to_value(&fresh)
            .map_err(|e| FetchError::Malformed(format!("Request encode failed: {}", e)))?;
        sign_value(&mut body, self.config.shared_secret);

        let response = self
            .http_client
            .post(format!("{}/feed/acknowledge", self.config.base_url))
            .json(&body)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let body = read_body(response).await?;
        serde_json::from_value(body)
            .map_err(|e| FetchError::Malformed(format!("Unexpected acknowledge shape: {}", e)))
    }
}

/// Classify the status, then read and parse the body as JSON
async fn read_body(response: reqwest::Response) -> Result<Value, FetchError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let text = response.text().await.unwrap_or_default();
        return Err(FetchError::Unauthorized(format!("{}: {}", status, text)));
    }

    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return Err(FetchError::Network(format!("Server returned {}", status)));
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(FetchError::Malformed(format!("Server returned {}: {}", status, text)));
    }

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("text/html"))
        .unwrap_or(false);

    let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;
    let text = String::from_utf8_lossy(&bytes);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(FetchError::Empty);
    }

    if is_html || trimmed.starts_with('<') {
        return Err(FetchError::Malformed(
            "Server returned HTML instead of JSON".to_string(),
        ));
    }

    serde_json::from_str(trimmed).map_err(|e| FetchError::Malformed(format!("Invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_kinds_retry() {
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(!ErrorKind::Unauthorized.is_retryable());
        assert!(!ErrorKind::MalformedResponse.is_retryable());
        assert!(!ErrorKind::EmptyResponse.is_retryable());
        assert!(!ErrorKind::MaxRetriesExceeded.is_retryable());
    }

    #[test]
    fn test_backoff_doubles() {
        let fetcher = ResilientFetcher::new(FetcherConfig::new("http://localhost")).unwrap();
        assert_eq!(fetcher.backoff_for(1), Duration::from_secs(1));
        assert_eq!(fetcher.backoff_for(2), Duration::from_secs(2));
        assert_eq!(fetcher.backoff_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_max_retries_error_keeps_last_cause() {
        let err = FetchError::MaxRetriesExceeded {
            attempts: 3,
            last: Box::new(FetchError::Timeout("slow".to_string())),
        };
        assert_eq!(err.kind(), ErrorKind::MaxRetriesExceeded);
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let fetcher = ResilientFetcher::new(FetcherConfig::new("http://localhost:5740/")).unwrap();
        assert_eq!(fetcher.config.base_url, "http://localhost:5740");
    }
}
