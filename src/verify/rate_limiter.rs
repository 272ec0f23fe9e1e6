//! Per-service rate limiting for outbound verification requests.
//!
//! This module provides the [`RateLimiter`] struct which enforces minimum
//! intervals between requests to the same service, keeping metadata APIs from
//! throttling or blocking the client during large verification runs.
//!
//! # Overview
//!
//! Pacing is applied per service key (normally a lowercase host name), so
//! requests to different services proceed in parallel without waiting for each
//! other. Only subsequent requests to the *same* service are delayed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use refcheck_core::verify::RateLimiter;
//!
//! # async fn example() {
//! // Pace calls to the same service at least 1 second apart
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
//!
//! // First acquisition proceeds immediately
//! limiter.acquire("api.crossref.org").await;
//!
//! // Second acquisition for the same service waits out the interval
//! limiter.acquire("api.crossref.org").await;
//!
//! // A different service proceeds immediately
//! limiter.acquire("doi.org").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_RETRY_AFTER};

/// Per-service rate limiter for verification requests.
///
/// This struct is designed to be wrapped in `Arc` and shared across multiple
/// Tokio tasks. It uses `DashMap` for lock-free concurrent access to per-service
/// state, and `tokio::sync::Mutex` for atomic read-update operations on timing.
///
/// # Thread Safety
///
/// `RateLimiter` is `Send + Sync`, making it safe to use with `Arc` and share
/// across spawned Tokio tasks.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum interval between requests to the same service.
    min_interval: Duration,

    /// Whether rate limiting is disabled (interval of zero).
    disabled: bool,

    /// Per-service state tracking.
    /// Uses Arc to allow cloning the state and releasing the `DashMap` lock
    /// before awaiting on the inner Mutex (prevents shard lock across await).
    services: DashMap<String, Arc<ServiceState>>,
}

/// State tracked for each service.
#[derive(Debug)]
struct ServiceState {
    /// Time of the last granted acquisition for this service.
    /// Protected by Mutex for atomic read-update operations.
    /// `None` indicates this service has not been called yet (first call is immediate).
    last_call: Mutex<Option<Instant>>,

    /// Cumulative delay applied to this service (in milliseconds).
    /// Used to warn when excessive rate limiting occurs.
    cumulative_delay_ms: AtomicU64,
}

impl ServiceState {
    /// Creates state for a service that hasn't been called yet.
    fn new() -> Self {
        Self {
            // None means first call - no delay needed
            last_call: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Adds to the cumulative delay and returns the new total.
    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    ///
    /// An interval of zero disables pacing entirely.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use refcheck_core::verify::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(Duration::from_millis(1000));
    /// ```
    #[must_use]
    #[instrument(skip_all, fields(interval_ms = min_interval.as_millis()))]
    pub fn new(min_interval: Duration) -> Self {
        debug!("creating rate limiter");
        Self {
            min_interval,
            disabled: min_interval.is_zero(),
            services: DashMap::new(),
        }
    }

    /// Creates a disabled rate limiter that applies no delays.
    ///
    /// Used for traffic that only needs the global concurrency cap, such as
    /// plain reachability checks against many unrelated hosts.
    #[must_use]
    #[instrument]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            min_interval: Duration::ZERO,
            disabled: true,
            services: DashMap::new(),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the minimum interval between requests.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Acquires permission to call the given service.
    ///
    /// Blocks until at least the minimum interval has elapsed since the last
    /// granted acquisition for `service_key`, then updates the last-call time.
    /// The first acquisition for any service proceeds immediately.
    ///
    /// Concurrent callers for the same key are serialized by the per-service
    /// mutex; Tokio wakes them in queue order, so none is starved.
    #[instrument(skip(self))]
    pub async fn acquire(&self, service_key: &str) {
        if self.disabled {
            return;
        }

        // Get or create service state, clone Arc to release DashMap lock before awaiting
        let state = self
            .services
            .entry(service_key.to_string())
            .or_insert_with(|| Arc::new(ServiceState::new()))
            .clone();

        // Lock the state to atomically check and update
        // Note: DashMap lock is released above, only Mutex lock is held during await
        let mut last_call_guard = state.last_call.lock().await;

        // Check if this is the first call (None) or a subsequent call
        if let Some(last_call) = *last_call_guard {
            let elapsed = last_call.elapsed();

            if elapsed < self.min_interval {
                let delay = self.min_interval.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);

                debug!(
                    service = %service_key,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying rate limit delay"
                );

                // Warn if cumulative delay exceeds threshold
                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        service = %service_key,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "excessive rate limiting - consider reducing request volume to this service"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        } else {
            debug!(service = %service_key, "first call to service - no delay");
        }

        // Update last call time after any delay
        *last_call_guard = Some(Instant::now());
    }

    /// Records a server-mandated rate limit delay (from a Retry-After header).
    ///
    /// This folds the server's answer into the service's cumulative delay
    /// accounting so excessive throttling by one service is visible in logs.
    #[instrument(skip(self))]
    pub fn record_rate_limit(&self, service_key: &str, delay: Duration) {
        let state = self
            .services
            .entry(service_key.to_string())
            .or_insert_with(|| Arc::new(ServiceState::new()))
            .clone();
        let cumulative = state.add_cumulative_delay(delay);

        debug!(
            service = %service_key,
            delay_ms = delay.as_millis(),
            cumulative_ms = cumulative.as_millis(),
            "recorded server rate limit"
        );

        // Warn if cumulative delay exceeds threshold
        if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            warn!(
                service = %service_key,
                cumulative_delay_secs = cumulative.as_secs(),
                "excessive server rate limiting - service may be under heavy load"
            );
        }
    }
}

/// Derives the rate-limiter service key for a URL.
///
/// Returns "unknown" for malformed URLs, ensuring all requests are still
/// rate limited even if the URL cannot be parsed.
///
/// # Examples
///
/// ```
/// use refcheck_core::verify::service_key_for_url;
///
/// assert_eq!(service_key_for_url("https://api.crossref.org/works/x"), "api.crossref.org");
/// assert_eq!(service_key_for_url("http://Example.COM/Path"), "example.com");
/// assert_eq!(service_key_for_url("https://localhost:8080/x"), "localhost");
/// assert_eq!(service_key_for_url("not a url"), "unknown");
/// ```
#[must_use]
pub fn service_key_for_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports two formats as per RFC 7231:
/// - Integer seconds: `Retry-After: 120`
/// - HTTP-date: `Retry-After: Wed, 21 Oct 2026 07:28:00 GMT`
///
/// Returns `None` if the value cannot be parsed. Caps excessive values at 1 hour.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use refcheck_core::verify::parse_retry_after;
///
/// // Integer seconds
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
///
/// // Zero seconds
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
///
/// // Invalid format
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
#[must_use]
#[instrument]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    // Try parsing as integer seconds first (most common)
    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }

        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);

        // Cap at maximum
        if duration > MAX_RETRY_AFTER {
            warn!(
                seconds,
                max_seconds = MAX_RETRY_AFTER.as_secs(),
                "Retry-After exceeds maximum, capping at 1 hour"
            );
            return Some(MAX_RETRY_AFTER);
        }

        return Some(duration);
    }

    // Try parsing as HTTP-date
    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();

        // Calculate duration until the specified time
        if let Ok(duration) = datetime.duration_since(now) {
            // Cap at maximum
            if duration > MAX_RETRY_AFTER {
                warn!(
                    delay_secs = duration.as_secs(),
                    max_secs = MAX_RETRY_AFTER.as_secs(),
                    "Retry-After date exceeds maximum, capping at 1 hour"
                );
                return Some(MAX_RETRY_AFTER);
            }
            Some(duration)
        } else {
            // Date is in the past
            debug!(
                header_value,
                "Retry-After date is in the past, returning zero"
            );
            Some(Duration::ZERO)
        }
    } else {
        debug!(header_value, "unparseable Retry-After value");
        None
    }
}
