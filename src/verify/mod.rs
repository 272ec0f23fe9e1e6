//! Verification core: link reachability and shared probing plumbing.
//!
//! This module owns everything both verification engines have in common
//! (the HTTP probe, the per-service rate limiter, the result cache) plus
//! the link engine and the coordinator that ties the engines together.
//!
//! # Architecture
//!
//! - [`Verifier`] - Coordinator constructing engines once and merging outputs
//! - [`LinkChecker`] - Worker-pool engine probing distinct link targets
//! - [`HttpProbe`] - Shared HTTP client with outcome classification
//! - [`RateLimiter`] - Per-service request spacing
//! - [`ResultCache`] - TTL cache with single-flight computation
//!
//! The retraction engine lives in [`crate::retraction`] and builds on the
//! same probe, limiter, and cache types.
//!
//! # Example
//!
//! ```no_run
//! use refcheck_core::Reference;
//! use refcheck_core::verify::{Verifier, VerifyOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = Verifier::new(VerifyOptions::default())?;
//!
//! let refs = vec![
//!     Reference::from_url("https://example.com/paper.pdf", Some(3)),
//!     Reference::doi("10.1126/science.aac4716", None),
//! ];
//! let report = verifier.verify(&refs).await;
//! println!("{} reachable", report.link_summary.reachable_count);
//! # Ok(())
//! # }
//! ```

mod cache;
pub(crate) mod constants;
mod coordinator;
mod error;
mod link;
mod probe;
mod rate_limiter;

pub use cache::ResultCache;
pub use constants::{
    DEFAULT_CACHE_TTL, DEFAULT_LINK_CONCURRENCY, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_RETRACTION_CONCURRENCY, DEFAULT_SERVICE_INTERVAL, MAX_LINK_CONCURRENCY,
    MAX_RETRACTION_CONCURRENCY,
};
pub use coordinator::{Verifier, VerifyOptions};
pub use error::{ConfigurationError, ErrorKind};
pub(crate) use error::validate_concurrency;
pub use link::{LinkChecker, LinkSummary};
pub use probe::{CheckResult, CrossrefWork, HttpProbe};
pub use rate_limiter::{RateLimiter, parse_retry_after, service_key_for_url};
