//! Retry policy: how many times to retry and how long to wait in between.
//!
//! Rate-limited responses back off from a longer base delay than server and network
//! failures. A `Retry-After` value sent by the provider takes precedence over both.

use crate::classify::FailureClass;
use rand::Rng;
use std::time::Duration;

/// Capped exponential backoff.
///
/// The delay before retry `n` (1-indexed) is `initial_delay * 2^(n - 1)`, capped at
/// `max_delay`.
///
/// # Examples
///
/// ```
/// use folio_api::retry::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(30));
/// assert_eq!(backoff.delay_for_retry(1), Duration::from_millis(500));
/// assert_eq!(backoff.delay_for_retry(3), Duration::from_millis(2000));
/// assert_eq!(backoff.delay_for_retry(20), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// The delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Scale each delay by a random factor between 50% and 100%.
    pub jitter: bool,
}

impl Backoff {
    /// Creates a backoff without jitter.
    pub const fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            jitter: false,
        }
    }

    /// Enables jitter.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Returns the delay before the given retry (1 = first retry).
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let multiplier = 2u64.saturating_pow(exponent);
        let base_delay = self
            .initial_delay
            .saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
        let delay = base_delay.min(self.max_delay);

        if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
            delay.mul_f64(jitter_factor)
        } else {
            delay
        }
    }
}

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default backoff for 429 responses without `Retry-After`.
pub const RATE_LIMIT_BACKOFF: Backoff =
    Backoff::new(Duration::from_millis(1000), Duration::from_millis(30_000));

/// Default backoff for 5xx responses and network failures.
pub const TRANSIENT_BACKOFF: Backoff =
    Backoff::new(Duration::from_millis(500), Duration::from_millis(30_000));

/// Decides whether, and after how long, a failed attempt is retried.
///
/// # Examples
///
/// ```
/// use folio_api::{classify::FailureClass, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
///
/// // 429 without Retry-After: 1s, 2s, 4s, then give up
/// assert_eq!(policy.delay(FailureClass::RateLimited, 1, None), Some(Duration::from_secs(1)));
/// assert_eq!(policy.delay(FailureClass::RateLimited, 3, None), Some(Duration::from_secs(4)));
/// assert_eq!(policy.delay(FailureClass::RateLimited, 4, None), None);
///
/// // Retry-After wins over computed backoff
/// assert_eq!(
///     policy.delay(FailureClass::ServerError, 1, Some(Duration::from_secs(7))),
///     Some(Duration::from_secs(7))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries; total attempts are `max_retries + 1`.
    pub max_retries: usize,
    /// Backoff used for 429 responses.
    pub rate_limited: Backoff,
    /// Backoff used for 5xx responses and network failures.
    pub transient: Backoff,
    /// Whether a `Retry-After` header overrides the computed backoff.
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limited: RATE_LIMIT_BACKOFF,
            transient: TRANSIENT_BACKOFF,
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Sets the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff for rate-limited responses.
    pub fn with_rate_limited_backoff(mut self, backoff: Backoff) -> Self {
        self.rate_limited = backoff;
        self
    }

    /// Sets the backoff for server and network failures.
    pub fn with_transient_backoff(mut self, backoff: Backoff) -> Self {
        self.transient = backoff;
        self
    }

    /// Sets whether `Retry-After` overrides the computed backoff.
    pub fn respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Returns the delay before the given retry, or `None` to give up.
    ///
    /// # Arguments
    ///
    /// * `class` - Classification of the failed attempt
    /// * `retry` - The retry about to be made (1-indexed)
    /// * `retry_after` - Delay requested by the provider, if any
    pub fn delay(
        &self,
        class: FailureClass,
        retry: usize,
        retry_after: Option<Duration>,
    ) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }

        let backoff = match class {
            FailureClass::RateLimited => &self.rate_limited,
            FailureClass::ServerError | FailureClass::Network => &self.transient,
            FailureClass::Permanent => return None,
        };

        match retry_after {
            Some(delay) if self.respect_retry_after => Some(delay),
            _ => Some(backoff.delay_for_retry(retry)),
        }
    }
}
