//! Rate limit handling: `Retry-After` parsing and user notifications.
//!
//! A provider that answers 429 is retried (see [`RetryPolicy`](crate::RetryPolicy)),
//! and the user is warned through a [`Notifier`]. Warnings share one cooldown across
//! every client built with the same [`RateLimitNotifications`], so a burst of 429s
//! from several providers produces a single warning.

use crate::clock::{Clock, SystemClock};
use http::{header::RETRY_AFTER, HeaderMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Minimum time between two rate-limit warnings.
pub const NOTIFICATION_COOLDOWN: Duration = Duration::from_secs(10);

/// Parses the `Retry-After` header into a delay relative to `now`.
///
/// Supports both delay-seconds and HTTP-date formats. A date in the past yields a
/// zero delay. Returns `None` when the header is missing or unparseable.
///
/// # Examples
///
/// ```
/// use folio_api::rate_limit::parse_retry_after;
/// use http::HeaderMap;
/// use std::time::{Duration, SystemTime};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "2".parse().unwrap());
///
/// assert_eq!(
///     parse_retry_after(&headers, SystemTime::now()),
///     Some(Duration::from_secs(2))
/// );
/// ```
pub fn parse_retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let header = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    // Try parsing as seconds
    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // Try parsing as HTTP date (RFC 7231 format)
    let target = httpdate::parse_http_date(header).ok()?;
    Some(target.duration_since(now).unwrap_or(Duration::ZERO))
}

/// Receives user-facing rate limit warnings.
///
/// In the dashboard this is a toast; the default [`TracingNotifier`] logs instead.
/// Implementations must not block.
pub trait Notifier: Send + Sync {
    /// Shows a warning about the API named `api`.
    fn warn(&self, api: &str, message: &str);
}

/// Emits rate limit warnings as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, api: &str, message: &str) {
        tracing::warn!(api = api, "{}", message);
    }
}

/// Shared cooldown for rate limit warnings.
///
/// Create one at the composition root and hand a clone to every client; clones
/// share state. Nothing here is process-global, so separate instances (for example
/// in tests) never interfere.
///
/// # Examples
///
/// ```
/// use folio_api::clock::ManualClock;
/// use folio_api::rate_limit::RateLimitNotifications;
/// use std::sync::Arc;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let clock = Arc::new(ManualClock::new(UNIX_EPOCH));
/// let notifications = RateLimitNotifications::builder()
///     .clock(clock.clone())
///     .build();
///
/// assert!(notifications.notify("Quotes"));
/// assert!(!notifications.notify("News"));
///
/// clock.advance(Duration::from_secs(11));
/// assert!(notifications.notify("News"));
/// ```
#[derive(Clone)]
pub struct RateLimitNotifications {
    inner: Arc<NotificationsInner>,
}

struct NotificationsInner {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    cooldown: Duration,
    last_shown: Mutex<Option<SystemTime>>,
}

impl RateLimitNotifications {
    /// Creates a new builder.
    pub fn builder() -> RateLimitNotificationsBuilder {
        RateLimitNotificationsBuilder::default()
    }

    /// Creates notifications that warn through `notifier`, using the system clock.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::builder().notifier(notifier).build()
    }

    /// The clock used for cooldowns and `Retry-After` dates.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// The configured cooldown.
    pub fn cooldown(&self) -> Duration {
        self.inner.cooldown
    }

    /// Records a rate-limited response from `api`.
    ///
    /// Shows a warning if more than the cooldown elapsed since the previous one and
    /// returns whether it did.
    pub fn notify(&self, api: &str) -> bool {
        let now = self.inner.clock.now();
        {
            let mut last_shown = self
                .inner
                .last_shown
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let due = match *last_shown {
                None => true,
                Some(previous) => now
                    .duration_since(previous)
                    .map(|elapsed| elapsed > self.inner.cooldown)
                    .unwrap_or(false),
            };

            if !due {
                tracing::debug!(api = api, "Rate limit warning suppressed by cooldown");
                return false;
            }
            *last_shown = Some(now);
        }

        let message = format!(
            "{} is rate limiting our requests. Some data may be delayed while we retry.",
            api
        );
        self.inner.notifier.warn(api, &message);
        true
    }
}

impl Default for RateLimitNotifications {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for RateLimitNotifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitNotifications")
            .field("clock", &self.inner.clock)
            .field("cooldown", &self.inner.cooldown)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RateLimitNotifications`].
#[derive(Default)]
pub struct RateLimitNotificationsBuilder {
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<Arc<dyn Notifier>>,
    cooldown: Option<Duration>,
}

impl RateLimitNotificationsBuilder {
    /// Sets the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets where warnings go.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the minimum time between warnings.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Builds the `RateLimitNotifications`.
    pub fn build(self) -> RateLimitNotifications {
        RateLimitNotifications {
            inner: Arc::new(NotificationsInner {
                clock: self
                    .clock
                    .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
                notifier: self
                    .notifier
                    .unwrap_or_else(|| Arc::new(TracingNotifier) as Arc<dyn Notifier>),
                cooldown: self.cooldown.unwrap_or(NOTIFICATION_COOLDOWN),
                last_shown: Mutex::new(None),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use http::{HeaderName, HeaderValue};
    use std::time::UNIX_EPOCH;

    #[derive(Default)]
    struct Recorder {
        warnings: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for Recorder {
        fn warn(&self, api: &str, message: &str) {
            self.warnings
                .lock()
                .unwrap()
                .push((api.to_string(), message.to_string()));
        }
    }

    fn base_time() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));

        let delay = parse_retry_after(&headers, base_time());
        assert_eq!(delay, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_retry_after_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"RETRY-AFTER").unwrap(),
            HeaderValue::from_static(" 3 "),
        );

        assert_eq!(
            parse_retry_after(&headers, base_time()),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = base_time();
        let target = httpdate::fmt_http_date(now + Duration::from_secs(5));
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_str(&target).unwrap());

        assert_eq!(parse_retry_after(&headers, now), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_retry_after_past_date_clamps_to_zero() {
        let now = base_time();
        let target = httpdate::fmt_http_date(now - Duration::from_secs(30));
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_str(&target).unwrap());

        assert_eq!(parse_retry_after(&headers, now), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_rejects_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers, base_time()), None);

        for value in ["soon", "-5", "1.5", "nan", "inf", ""] {
            headers.insert("retry-after", HeaderValue::from_static(value));
            assert_eq!(parse_retry_after(&headers, base_time()), None, "{:?}", value);
        }
    }

    #[test]
    fn test_cooldown_suppresses_repeat_warnings() {
        let clock = Arc::new(ManualClock::new(base_time()));
        let recorder = Arc::new(Recorder::default());
        let notifications = RateLimitNotifications::builder()
            .clock(clock.clone())
            .notifier(recorder.clone())
            .build();

        assert!(notifications.notify("Stock quotes"));
        clock.advance(Duration::from_secs(4));
        assert!(!notifications.notify("Market news"));

        // Exactly at the cooldown is still suppressed
        clock.advance(Duration::from_secs(6));
        assert!(!notifications.notify("Market news"));

        clock.advance(Duration::from_millis(1));
        assert!(notifications.notify("Market news"));

        let warnings = recorder.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].0, "Stock quotes");
        assert!(warnings[0].1.contains("Stock quotes"));
        assert_eq!(warnings[1].0, "Market news");
    }

    #[test]
    fn test_clones_share_cooldown() {
        let clock = Arc::new(ManualClock::new(base_time()));
        let first = RateLimitNotifications::builder().clock(clock).build();
        let second = first.clone();

        assert!(first.notify("Crypto prices"));
        assert!(!second.notify("Exchange rates"));
    }

    #[test]
    fn test_separate_instances_are_independent() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(base_time()));
        let first = RateLimitNotifications::builder().clock(clock.clone()).build();
        let second = RateLimitNotifications::builder().clock(clock).build();

        assert!(first.notify("Crypto prices"));
        assert!(second.notify("Crypto prices"));
    }
}
