//! Constants for the verification engines (timeouts, concurrency, pacing).

use std::time::Duration;

/// Default per-request probe timeout (10 seconds).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of redirects a probe will follow before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Default worker count for link reachability checks.
pub const DEFAULT_LINK_CONCURRENCY: usize = 5;

/// Upper bound on link check workers.
pub const MAX_LINK_CONCURRENCY: usize = 100;

/// Default worker count for retraction lookups (metadata APIs want gentler traffic).
pub const DEFAULT_RETRACTION_CONCURRENCY: usize = 2;

/// Upper bound on retraction lookup workers.
pub const MAX_RETRACTION_CONCURRENCY: usize = 10;

/// Minimum interval between calls to the same metadata service.
pub const DEFAULT_SERVICE_INTERVAL: Duration = Duration::from_secs(1);

/// Default time-to-live for cached check results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Warning threshold for cumulative rate limit delay per service (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Maximum Retry-After header value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);
