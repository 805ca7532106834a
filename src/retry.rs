use crate::error::TripMapError;
use rand::Rng;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Distinguishes failures worth another attempt from ones that are not.
#[derive(Debug)]
pub enum RetryError {
    /// Retryable error (timeouts, connection resets, 5xx and 429 responses)
    Retryable(TripMapError),
    /// Non-retryable error (other 4xx responses, malformed payloads)
    NonRetryable(TripMapError),
}

impl RetryError {
    pub fn into_inner(self) -> TripMapError {
        match self {
            RetryError::Retryable(err) | RetryError::NonRetryable(err) => err,
        }
    }

    /// Classify a transport error from reqwest.
    pub fn from_http(err: reqwest::Error) -> Self {
        let retryable = err.is_timeout()
            || err.is_connect()
            || err
                .status()
                .map(|s| s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS)
                .unwrap_or(false);
        if retryable {
            RetryError::Retryable(err.into())
        } else {
            RetryError::NonRetryable(err.into())
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    max_attempts: u32,
    /// Base delay for exponential backoff.
    base_delay_ms: u64,
    /// Maximum jitter to add to backoff delay (as fraction of delay, e.g., 0.25 = ±25%).
    jitter_factor: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryConfig {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay.as_millis() as u64,
            jitter_factor: 0.25,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig::new(3, Duration::from_millis(2000))
    }
}

/// Run `func` until it succeeds, fails with a non-retryable error, or runs
/// out of attempts. The last error is returned.
pub fn with_retry<F, T>(mut func: F, config: &RetryConfig) -> Result<T, RetryError>
where
    F: FnMut() -> Result<T, RetryError>,
{
    let mut attempt = 0;
    loop {
        match func() {
            Ok(result) => return Ok(result),
            Err(RetryError::Retryable(err)) if attempt + 1 < config.max_attempts => {
                let delay = backoff_with_jitter(attempt, config);
                log::warn!(
                    "Retryable error: {} (attempt {}/{}, retrying after {:?})",
                    err,
                    attempt + 1,
                    config.max_attempts,
                    delay
                );
                sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Calculate backoff delay with jitter for a given attempt.
///
/// Uses exponential backoff: base_delay * 2^attempt, plus a random jitter
/// of ±jitter_factor.
fn backoff_with_jitter(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = config.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    let jitter_range = (base_delay as f64 * config.jitter_factor) as u64;
    if jitter_range == 0 {
        return Duration::from_millis(base_delay);
    }
    let jitter = rand::rng().random_range(0..=jitter_range * 2) as i64 - jitter_range as i64;
    let delay_ms = (base_delay as i64 + jitter).max(0) as u64;
    Duration::from_millis(delay_ms)
}

/// Enforces a minimum spacing between calls to a rate-limited service.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        RateLimiter {
            min_delay,
            last_call: None,
        }
    }

    /// Block until `min_delay` has passed since the previous call.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                sleep(self.min_delay - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }
}
