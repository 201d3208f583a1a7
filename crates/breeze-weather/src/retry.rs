//! Backoff for Open-Meteo calls.
//!
//! Geocoding and forecast requests are retried on timeouts, dropped
//! connections, 5xx, 408 and 429 (Open-Meteo rate limits free clients).
//! Other 4xx answers are final: a bad coordinate or unknown place will not
//! fix itself on the next attempt.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// How hard to try one weather request. `max_retries` comes from
/// `weather.max_retries` in the config; zero means a single attempt.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// First backoff; doubles per attempt
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// Classify a transport-level reqwest error
pub fn is_retryable_error(error: &reqwest::Error) -> RetryDecision {
    if error.is_timeout() || error.is_connect() {
        return RetryDecision::Retry;
    }
    if error.is_request() {
        return RetryDecision::NoRetry;
    }
    match error.status() {
        Some(status) => is_retryable_status(status),
        None => RetryDecision::NoRetry,
    }
}

/// Classify an HTTP status
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        RetryDecision::Retry
    } else {
        RetryDecision::NoRetry
    }
}

/// Send a weather request, resending it while the outcome is retryable.
///
/// Once retries run out the last response is handed back unchanged, so the
/// caller still turns a final 503 into `WeatherError::Api`.
pub async fn with_retry<F, Fut>(config: &RetryConfig, operation: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt - 1);
            tracing::debug!("Weather request retry {}/{} in {:?}", attempt, config.max_retries, delay);
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) == RetryDecision::Retry
                    && attempt < config.max_retries
                {
                    tracing::warn!("Weather service answered {} (attempt {})", status, attempt + 1);
                    attempt += 1;
                    continue;
                }

                if attempt > 0 {
                    tracing::info!("Weather request settled with {} after {} retries", status, attempt);
                }
                return Ok(response);
            }
            Err(e) => {
                if is_retryable_error(&e) == RetryDecision::NoRetry {
                    tracing::debug!("Weather request failed for good: {}", e);
                    return Err(e);
                }
                if attempt >= config.max_retries {
                    tracing::error!("Weather request gave up after {} attempts: {}", attempt + 1, e);
                    return Err(e);
                }

                tracing::warn!("Weather request attempt {} failed: {}", attempt + 1, e);
                attempt += 1;
            }
        }
    }
}
