//! HTTP retrieval with bounded exponential backoff.
//!
//! Feeds and article pages go through the same [`Fetch`] seam:
//! - [`Fetch`]: core trait, URL in, body text out
//! - [`HttpFetcher`]: `reqwest` implementation with a request timeout
//! - [`RetryFetch`]: decorator that retries transient failures
//!
//! # Retry Strategy
//!
//! - Only [`FetchError::is_transient`] errors are retried (a 404 never is)
//! - Exponential backoff from `base_delay`, capped at 10 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::error::FetchError;
use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Trait for async body retrieval.
///
/// Implementors return the response body of `url` as text, or a typed error.
/// The pipeline only depends on this trait, so tests can serve pages from
/// memory.
pub trait Fetch {
    /// Retrieve the body at `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain HTTP(S) GET with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the given timeout and user agent.
    pub fn new(timeout: StdDuration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched body"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`] implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Maximum number of retries after the first attempt. Zero disables retrying.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap.
    max_delay: StdDuration,
    /// Upper bound on jitter added to each delay, in milliseconds.
    jitter_ms: u64,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    /// Create a new retry wrapper around an existing [`Fetch`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(Duration::from_secs(15), "news_keyword_digest")?;
    /// let fetcher = RetryFetch::new(http, 2, Duration::from_millis(500));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(10),
            jitter_ms: 250,
        }
    }

    /// Disable jitter. Keeps test timings exact.
    #[cfg(test)]
    fn without_jitter(mut self) -> Self {
        self.jitter_ms = 0;
        self
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() {
                        debug!(attempt, error = %e, "fetch() failed permanently");
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    let factor = 1u32.checked_shl((attempt - 1) as u32).unwrap_or(u32::MAX);
                    let mut delay = self.base_delay.saturating_mul(factor);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    if self.jitter_ms > 0 {
                        let jitter: u64 = rng().random_range(0..=self.jitter_ms);
                        delay += StdDuration::from_millis(jitter);
                    }

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
