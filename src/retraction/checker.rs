//! Batch retraction checking over a worker pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::verify::{
    ConfigurationError, ErrorKind, HttpProbe, MAX_RETRACTION_CONCURRENCY, RateLimiter,
    ResultCache, validate_concurrency,
};

use super::{
    CrossrefMetadataStrategy, LandingPageStrategy, RetractionStrategy, RetractionVerdict,
    StrategyOutcome,
};

/// Aggregate counts over one batch of retraction checks.
///
/// The counts always satisfy `retracted_count + clean_count + error_count ==
/// total`; the DOI lists are sorted so output is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetractionSummary {
    /// Distinct DOIs checked.
    pub total: usize,
    /// DOIs with a confirmed retraction.
    pub retracted_count: usize,
    /// DOIs checked successfully with no retraction evidence.
    pub clean_count: usize,
    /// DOIs that could not be checked.
    pub error_count: usize,
    /// The retracted DOIs, sorted.
    pub retracted_dois: Vec<String>,
    /// The uncheckable DOIs, sorted.
    pub error_dois: Vec<String>,
}

impl RetractionSummary {
    /// Tallies a verdict mapping.
    #[must_use]
    pub fn from_verdicts(verdicts: &HashMap<String, RetractionVerdict>) -> Self {
        let mut retracted_dois = Vec::new();
        let mut error_dois = Vec::new();

        for (doi, verdict) in verdicts {
            if verdict.is_retracted {
                retracted_dois.push(doi.clone());
            } else if verdict.error.is_some() {
                error_dois.push(doi.clone());
            }
        }
        retracted_dois.sort_unstable();
        error_dois.sort_unstable();

        let total = verdicts.len();
        let retracted_count = retracted_dois.len();
        let error_count = error_dois.len();
        Self {
            total,
            retracted_count,
            clean_count: total - retracted_count - error_count,
            error_count,
            retracted_dois,
            error_dois,
        }
    }
}

/// Batch retraction checker applying the evidence chain per DOI.
///
/// Each distinct DOI is resolved at most once per cache TTL; within a batch,
/// duplicates collapse before any work is queued. The default chain consults
/// CrossRef metadata first and falls back to the landing page.
pub struct RetractionChecker {
    probe: Arc<HttpProbe>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache<RetractionVerdict>>,
    cache_ttl: Duration,
    concurrency: usize,
    strategies: Arc<Vec<Box<dyn RetractionStrategy>>>,
    progress: Option<Arc<AtomicUsize>>,
}

impl RetractionChecker {
    /// Creates a checker with the default evidence chain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConcurrency`] when `concurrency`
    /// is zero or exceeds the engine maximum.
    pub fn new(
        probe: Arc<HttpProbe>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache<RetractionVerdict>>,
        concurrency: usize,
        cache_ttl: Duration,
    ) -> Result<Self, ConfigurationError> {
        validate_concurrency(concurrency, MAX_RETRACTION_CONCURRENCY)?;
        Ok(Self {
            probe,
            limiter,
            cache,
            cache_ttl,
            concurrency,
            strategies: Arc::new(vec![
                Box::new(CrossrefMetadataStrategy::new()),
                Box::new(LandingPageStrategy::new()),
            ]),
            progress: None,
        })
    }

    /// Replaces the evidence chain.
    ///
    /// Strategies are tried in the given order. Primarily used for testing
    /// with stub strategies.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn RetractionStrategy>>) -> Self {
        self.strategies = Arc::new(strategies);
        self
    }

    /// Attaches a counter incremented once per completed DOI.
    #[must_use]
    pub fn with_progress_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.progress = Some(counter);
        self
    }

    /// Checks every distinct DOI in `dois` for retraction.
    ///
    /// Duplicates collapse to a single resolution; an empty or whitespace
    /// DOI yields a parse-error verdict without touching the network. With
    /// `verbose` set, one info-level line is emitted per DOI; the flag never
    /// changes the returned data.
    #[instrument(skip(self, dois), fields(dois = dois.len()))]
    pub async fn check_dois(
        &self,
        dois: &[String],
        verbose: bool,
    ) -> HashMap<String, RetractionVerdict> {
        let mut seen = HashSet::new();
        let mut verdicts = HashMap::new();
        let mut pending = Vec::new();

        for doi in dois {
            if !seen.insert(doi.as_str()) {
                continue;
            }
            if doi.trim().is_empty() {
                debug!("empty DOI, recording parse error without lookup");
                let verdict = RetractionVerdict::failed(doi, ErrorKind::Parse);
                log_verdict(&verdict, verbose);
                self.bump_progress();
                verdicts.insert(doi.clone(), verdict);
            } else {
                pending.push(doi.clone());
            }
        }

        if pending.is_empty() {
            return verdicts;
        }

        let workers = self.concurrency.min(pending.len());
        info!(distinct = pending.len(), workers, "checking DOIs for retraction");

        let (tx, rx) = async_channel::bounded(pending.len());
        for doi in pending {
            let _ = tx.send(doi).await;
        }
        tx.close();

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = rx.clone();
            let probe = Arc::clone(&self.probe);
            let limiter = Arc::clone(&self.limiter);
            let strategies = Arc::clone(&self.strategies);
            let cache = Arc::clone(&self.cache);
            let ttl = self.cache_ttl;
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                let mut batch = Vec::new();
                while let Ok(doi) = rx.recv().await {
                    let verdict = cache
                        .get_or_compute(&doi, ttl, || {
                            resolve_doi(&probe, &limiter, &strategies, &doi)
                        })
                        .await;

                    log_verdict(&verdict, verbose);
                    if let Some(counter) = &progress {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    batch.push(verdict);
                }
                batch
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(batch) => {
                    for verdict in batch {
                        verdicts.insert(verdict.doi.clone(), verdict);
                    }
                }
                Err(e) => warn!(error = %e, "retraction worker panicked"),
            }
        }

        let retracted = verdicts.values().filter(|v| v.is_retracted).count();
        info!(
            checked = verdicts.len(),
            retracted, "retraction check complete"
        );
        verdicts
    }

    fn bump_progress(&self) {
        if let Some(counter) = &self.progress {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for RetractionChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetractionChecker")
            .field("concurrency", &self.concurrency)
            .field("cache_ttl", &self.cache_ttl)
            .field("strategies", &self.strategies.len())
            .finish_non_exhaustive()
    }
}

/// Runs the evidence chain for one DOI.
///
/// Short-circuits on the first confirmed signal. A verdict carries an error
/// only when every strategy failed; the first failure's kind is kept, since
/// earlier strategies are the more authoritative sources.
async fn resolve_doi(
    probe: &HttpProbe,
    limiter: &RateLimiter,
    strategies: &[Box<dyn RetractionStrategy>],
    doi: &str,
) -> RetractionVerdict {
    let mut failures = 0;
    let mut first_failure = None;

    for strategy in strategies {
        limiter.acquire(&strategy.service_key(probe)).await;

        match strategy.attempt(doi, probe).await {
            StrategyOutcome::Confirmed(signal) => {
                debug!(strategy = strategy.name(), "retraction confirmed");
                return RetractionVerdict::retracted(doi, signal);
            }
            StrategyOutcome::Inconclusive => {
                debug!(strategy = strategy.name(), "no evidence, trying next source");
            }
            StrategyOutcome::Failed(kind) => {
                debug!(strategy = strategy.name(), %kind, "source unavailable");
                failures += 1;
                first_failure.get_or_insert(kind);
            }
        }
    }

    match first_failure {
        Some(kind) if failures == strategies.len() => RetractionVerdict::failed(doi, kind),
        _ => RetractionVerdict::clean(doi),
    }
}

fn log_verdict(verdict: &RetractionVerdict, verbose: bool) {
    if verbose {
        info!(
            doi = %verdict.doi,
            retracted = verdict.is_retracted,
            source = %verdict.confidence_source,
            error = ?verdict.error,
            "DOI checked"
        );
    } else {
        debug!(
            doi = %verdict.doi,
            retracted = verdict.is_retracted,
            source = %verdict.confidence_source,
            error = ?verdict.error,
            "DOI checked"
        );
    }
}
