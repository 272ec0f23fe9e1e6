//! Verification coordinator wiring both engines together.
//!
//! # Overview
//!
//! [`Verifier`] owns the shared plumbing (HTTP probe, rate limiter, result
//! caches) and the two engines, constructed once from [`VerifyOptions`].
//! [`verify`](Verifier::verify) partitions a reference batch by type, runs
//! the enabled engines, and merges their outputs into one [`Report`]. A
//! disabled engine contributes an empty section, never an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::reference::{RefKind, Reference};
use crate::report::Report;
use crate::retraction::{RetractionChecker, RetractionSummary};

use super::cache::ResultCache;
use super::constants::{
    DEFAULT_CACHE_TTL, DEFAULT_LINK_CONCURRENCY, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_RETRACTION_CONCURRENCY, DEFAULT_SERVICE_INTERVAL,
};
use super::error::ConfigurationError;
use super::link::{LinkChecker, LinkSummary, distinct_link_targets};
use super::probe::HttpProbe;
use super::rate_limiter::RateLimiter;

/// Configuration for one [`Verifier`].
///
/// All fields are explicit parameters; nothing is read from the environment.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Run the link reachability engine.
    pub check_links: bool,
    /// Run the retraction engine.
    pub check_retractions: bool,
    /// Worker count for link probes.
    pub link_concurrency: usize,
    /// Worker count for DOI checks.
    pub retraction_concurrency: usize,
    /// Per-request timeout for every probe.
    pub request_timeout: Duration,
    /// Minimum spacing between requests to one service.
    pub min_request_interval: Duration,
    /// How long cached results stay valid.
    pub cache_ttl: Duration,
    /// Emit one log line per checked identifier.
    pub verbose: bool,
    /// Override the CrossRef API base URL. Primarily used for testing.
    pub crossref_base: Option<String>,
    /// Override the DOI resolver base URL. Primarily used for testing.
    pub doi_base: Option<String>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            check_links: true,
            check_retractions: true,
            link_concurrency: DEFAULT_LINK_CONCURRENCY,
            retraction_concurrency: DEFAULT_RETRACTION_CONCURRENCY,
            request_timeout: DEFAULT_PROBE_TIMEOUT,
            min_request_interval: DEFAULT_SERVICE_INTERVAL,
            cache_ttl: DEFAULT_CACHE_TTL,
            verbose: false,
            crossref_base: None,
            doi_base: None,
        }
    }
}

/// Coordinator owning the engines and their shared plumbing.
///
/// Construction validates every configuration value and builds the HTTP
/// client once; a constructed verifier can run any number of batches, and
/// results carry over between batches through the caches.
#[derive(Debug)]
pub struct Verifier {
    options: VerifyOptions,
    link_checker: LinkChecker,
    retraction_checker: RetractionChecker,
}

impl Verifier {
    /// Creates a verifier from the given options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when a concurrency value is out of
    /// range, the timeout is zero, or the HTTP client cannot be built.
    pub fn new(options: VerifyOptions) -> Result<Self, ConfigurationError> {
        let limiter = Arc::new(RateLimiter::new(options.min_request_interval));

        let mut probe = HttpProbe::new(options.request_timeout, Arc::clone(&limiter))?;
        if let Some(base) = &options.crossref_base {
            probe = probe.with_crossref_base(base);
        }
        if let Some(base) = &options.doi_base {
            probe = probe.with_doi_base(base);
        }
        let probe = Arc::new(probe);

        let link_checker = LinkChecker::new(
            Arc::clone(&probe),
            Arc::new(ResultCache::new()),
            options.link_concurrency,
            options.cache_ttl,
        )?;
        let retraction_checker = RetractionChecker::new(
            probe,
            limiter,
            Arc::new(ResultCache::new()),
            options.retraction_concurrency,
            options.cache_ttl,
        )?;

        Ok(Self {
            options,
            link_checker,
            retraction_checker,
        })
    }

    /// Attaches a counter incremented once per completed check, across both
    /// engines.
    #[must_use]
    pub fn with_progress_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.link_checker = self.link_checker.with_progress_counter(Arc::clone(&counter));
        self.retraction_checker = self.retraction_checker.with_progress_counter(counter);
        self
    }

    /// Number of checks a batch will perform, for progress displays.
    ///
    /// Counts distinct link targets and distinct DOIs, honoring which
    /// engines are enabled.
    #[must_use]
    pub fn planned_checks(&self, refs: &[Reference]) -> usize {
        let mut planned = 0;
        if self.options.check_links {
            planned += distinct_link_targets(refs).len();
        }
        if self.options.check_retractions {
            planned += distinct_dois(refs).len();
        }
        planned
    }

    /// Verifies a reference batch and merges both engines' outputs.
    ///
    /// Duplicates in `refs` are tolerated; each engine deduplicates its own
    /// slice of the batch. Per-identifier failures are data inside the
    /// report, so this method never fails.
    #[instrument(skip(self, refs), fields(refs = refs.len()))]
    pub async fn verify(&self, refs: &[Reference]) -> Report {
        let (link_results, link_summary) = if self.options.check_links {
            self.link_checker
                .check_references(refs, self.options.verbose)
                .await
        } else {
            debug!("link checking disabled");
            (Vec::new(), LinkSummary::from_results(&[]))
        };

        let (retraction_results, retraction_summary) = if self.options.check_retractions {
            let dois = distinct_dois(refs);
            let verdicts = self
                .retraction_checker
                .check_dois(&dois, self.options.verbose)
                .await;
            let summary = RetractionSummary::from_verdicts(&verdicts);
            (verdicts, summary)
        } else {
            debug!("retraction checking disabled");
            (
                HashMap::new(),
                RetractionSummary::from_verdicts(&HashMap::new()),
            )
        };

        info!(
            links = link_summary.total,
            dois = retraction_summary.total,
            "verification complete"
        );
        Report {
            link_results,
            link_summary,
            retraction_results,
            retraction_summary,
        }
    }
}

/// Collects the distinct DOI identifiers from a reference batch,
/// preserving first-seen order.
fn distinct_dois(refs: &[Reference]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut dois = Vec::new();
    for reference in refs {
        if reference.kind == RefKind::Doi && seen.insert(reference.identifier.as_str()) {
            dois.push(reference.identifier.clone());
        }
    }
    dois
}
