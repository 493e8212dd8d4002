//! Page fetching with a fixed-delay retry policy.
//!
//! The portal is read through the [`PageSource`] trait so the retry logic can
//! be layered on top of any source:
//! - [`HttpPageSource`]: a single `GET` with a timeout, non-2xx is an error
//! - [`RetryFetch`]: decorator that re-issues a failed `GET` according to a
//!   [`RetryPolicy`]
//!
//! # Retry Strategy
//!
//! - 3 attempts in total
//! - Fixed 1 second delay between attempts, no backoff and no jitter
//! - Every failure is retried the same way (transport errors and bad statuses)

use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Request timeout applied to every page `GET`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The portal serves trimmed markup to unknown clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Errors raised while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected response status {status} at {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },
}

impl FetchError {
    /// The HTTP status behind this failure, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Anything that can turn a URL into a [`Page`].
pub trait PageSource {
    async fn get(&self, url: &str) -> Result<Page, FetchError>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    async fn get(&self, url: &str) -> Result<Page, FetchError> {
        (**self).get(url).await
    }
}

/// Pause between attempts. Swapped for a recording fake in tests.
pub trait Sleeper {
    async fn sleep(&self, delay: Duration);
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    async fn sleep(&self, delay: Duration) {
        (**self).sleep(delay).await
    }
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// How often and how patiently a failed fetch is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included. Never below 1.
    pub max_attempts: u32,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Plain HTTP page source built on a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Build a source whose requests time out after `timeout`.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<Page, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = resp.url().to_string();
        let body = resp.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Fetched page");
        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Decorator that repeats failed fetches of the wrapped [`PageSource`].
///
/// The inner source is called at most `policy.max_attempts` times. Between two
/// attempts the sleeper is asked to wait `policy.delay`; there is no wait after
/// the final attempt, whose error is handed back unchanged.
pub struct RetryFetch<S, Z = TokioSleeper> {
    inner: S,
    policy: RetryPolicy,
    sleeper: Z,
}

impl<S> RetryFetch<S, TokioSleeper> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self::with_sleeper(inner, policy, TokioSleeper)
    }
}

impl<S, Z> RetryFetch<S, Z> {
    pub fn with_sleeper(inner: S, policy: RetryPolicy, sleeper: Z) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl<S, Z> fmt::Debug for RetryFetch<S, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.policy.max_attempts)
            .field("delay", &self.policy.delay)
            .finish()
    }
}

impl<S, Z> PageSource for RetryFetch<S, Z>
where
    S: PageSource,
    Z: Sleeper,
{
    #[instrument(level = "info", skip(self))]
    async fn get(&self, url: &str) -> Result<Page, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.inner.get(url).await {
                Ok(page) => {
                    if attempt > 1 {
                        debug!(attempt, "Fetch succeeded after retrying");
                    }
                    return Ok(page);
                }
                Err(e) => {
                    let total_dt = total_t0.elapsed();
                    if attempt >= self.policy.max_attempts {
                        error!(
                            attempt,
                            max = self.policy.max_attempts,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        attempt,
                        max = self.policy.max_attempts,
                        elapsed_ms_total = total_dt.as_millis(),
                        delay = ?self.policy.delay,
                        error = %e,
                        "fetch attempt failed; retrying"
                    );
                    self.sleeper.sleep(self.policy.delay).await;
                }
            }
        }
    }
}
