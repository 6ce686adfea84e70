use futures::StreamExt;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use super::entry::RawEntry;
use super::parser::parse_entries;

/// Feeds larger than this are refused.
const MAX_FEED_BYTES: usize = 10 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching a feed.
///
/// Any of these aborts the run before anything is queued.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out after 30s")]
    Timeout,
    /// Body is neither RSS nor Atom.
    #[error("Parse error: {0}")]
    Parse(String),
    /// 429 on every attempt.
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Feed exceeds {} bytes", MAX_FEED_BYTES)]
    ResponseTooLarge,
    /// Fewer bytes arrived than Content-Length announced.
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// How often and how patiently a transient failure is retried.
///
/// Delays double per attempt: `base_delay`, `2 * base_delay`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Outcome of a single GET.
enum Attempt {
    Body(Vec<u8>),
    RateLimited,
    /// Worth another try; carries the error to return once retries run out.
    Transient(FetchError),
}

/// Fetches and parses a feed into raw entries.
///
/// # Errors
///
/// - [`FetchError::Network`] / [`FetchError::Timeout`] - transport failures
/// - [`FetchError::HttpStatus`] - non-2xx response (5xx only after retries)
/// - [`FetchError::RateLimited`] - 429 response after max retries
/// - [`FetchError::ResponseTooLarge`] - body exceeded 10MB
/// - [`FetchError::Parse`] - body is not RSS or Atom
pub async fn fetch_entries(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<RawEntry>, FetchError> {
    let bytes = fetch_feed(client, url, RetryPolicy::default()).await?;
    let entries = parse_entries(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
    tracing::debug!(feed = %url, entries = entries.len(), "Parsed feed");
    Ok(entries)
}

/// Downloads the raw feed body.
///
/// 429, 5xx and truncated bodies are retried per `policy`. Other 4xx
/// responses fail immediately.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    policy: RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    let mut attempt = 0;
    loop {
        let error = match fetch_once(client, url).await? {
            Attempt::Body(bytes) => return Ok(bytes),
            Attempt::RateLimited => FetchError::RateLimited(policy.max_retries),
            Attempt::Transient(error) => error,
        };
        if attempt >= policy.max_retries {
            return Err(error);
        }

        let delay = policy.delay(attempt);
        tracing::warn!(
            feed = %url,
            error = %error,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "Feed fetch failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<Attempt, FetchError> {
    let response = tokio::time::timeout(REQUEST_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)??;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Ok(Attempt::RateLimited);
    }
    if status.is_server_error() {
        return Ok(Attempt::Transient(FetchError::HttpStatus(status.as_u16())));
    }
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    match read_body(response, MAX_FEED_BYTES).await {
        Ok(bytes) => Ok(Attempt::Body(bytes)),
        Err(e @ FetchError::IncompleteResponse { .. }) => Ok(Attempt::Transient(e)),
        Err(e) => Err(e),
    }
}

/// Streams the body, refusing anything over `limit` bytes.
async fn read_body(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    let announced = response.content_length();
    if announced.is_some_and(|len| len > limit as u64) {
        return Err(FetchError::ResponseTooLarge);
    }

    let mut body = Vec::with_capacity(announced.unwrap_or(0) as usize);
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    match announced {
        Some(expected) if (body.len() as u64) < expected => Err(FetchError::IncompleteResponse {
            expected,
            received: body.len(),
        }),
        _ => Ok(body),
    }
}
