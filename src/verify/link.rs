//! Link reachability engine.
//!
//! # Overview
//!
//! [`LinkChecker`] takes a batch of extracted references, keeps the ones that
//! point at something fetchable (URLs, PDF links, arXiv IDs), deduplicates
//! them, and probes each distinct target once through a fixed-size worker
//! pool. Workers pull targets from a shared queue, so a handful of slow hosts
//! never starves the rest of the batch, and the pool size bounds how many
//! probes are in flight at once.
//!
//! Results come back with a [`LinkSummary`] whose counts partition the batch:
//! every target is exactly one of reachable, unreachable (the server answered
//! an error status), or errored (no usable answer at all).

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::reference::Reference;

use super::cache::ResultCache;
use super::constants::MAX_LINK_CONCURRENCY;
use super::error::{ConfigurationError, validate_concurrency};
use super::probe::{CheckResult, HttpProbe};

/// Aggregate counts over one batch of link checks.
///
/// The three outcome counts always sum to `total`; aggregation is a
/// commutative reduction, so worker completion order never shows through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    /// Distinct targets checked.
    pub total: usize,
    /// Targets that answered a 2xx/3xx status.
    pub reachable_count: usize,
    /// Targets that answered an error status with no transport fault.
    pub unreachable_count: usize,
    /// Targets whose check failed outright (network, TLS, throttling).
    pub error_count: usize,
}

impl LinkSummary {
    /// Tallies a batch of check results.
    #[must_use]
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            reachable_count: 0,
            unreachable_count: 0,
            error_count: 0,
        };
        for result in results {
            if result.reachable {
                summary.reachable_count += 1;
            } else if result.error.is_some() {
                summary.error_count += 1;
            } else {
                summary.unreachable_count += 1;
            }
        }
        summary
    }
}

/// Batch link verifier backed by a shared worker pool.
///
/// Construction validates the worker count; checking never fails, every
/// per-target problem is folded into that target's [`CheckResult`].
#[derive(Debug)]
pub struct LinkChecker {
    probe: Arc<HttpProbe>,
    cache: Arc<ResultCache<CheckResult>>,
    cache_ttl: Duration,
    concurrency: usize,
    progress: Option<Arc<AtomicUsize>>,
}

impl LinkChecker {
    /// Creates a checker running at most `concurrency` probes in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConcurrency`] when `concurrency`
    /// is zero or exceeds the engine maximum.
    pub fn new(
        probe: Arc<HttpProbe>,
        cache: Arc<ResultCache<CheckResult>>,
        concurrency: usize,
        cache_ttl: Duration,
    ) -> Result<Self, ConfigurationError> {
        validate_concurrency(concurrency, MAX_LINK_CONCURRENCY)?;
        Ok(Self {
            probe,
            cache,
            cache_ttl,
            concurrency,
            progress: None,
        })
    }

    /// Attaches a counter incremented once per completed target.
    ///
    /// Lets a caller drive a progress display without threading callbacks
    /// through the pool.
    #[must_use]
    pub fn with_progress_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.progress = Some(counter);
        self
    }

    /// Checks every distinct link target in `refs` for reachability.
    ///
    /// References without a fetchable target (DOIs) are skipped; duplicates
    /// collapse to a single probe. With `verbose` set, one info-level line is
    /// emitted per target; the flag never changes the returned data.
    ///
    /// Targets already cached from an earlier batch contribute zero network
    /// calls.
    #[instrument(skip(self, refs), fields(refs = refs.len()))]
    pub async fn check_references(
        &self,
        refs: &[Reference],
        verbose: bool,
    ) -> (Vec<CheckResult>, LinkSummary) {
        let targets = distinct_link_targets(refs);
        if targets.is_empty() {
            debug!("no link targets to check");
            return (Vec::new(), LinkSummary::from_results(&[]));
        }

        let workers = self.concurrency.min(targets.len());
        info!(
            distinct = targets.len(),
            workers, "checking link reachability"
        );

        let (tx, rx) = async_channel::bounded(targets.len());
        for target in targets {
            // Capacity covers the whole batch, sends never block.
            let _ = tx.send(target).await;
        }
        tx.close();

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = rx.clone();
            let probe = Arc::clone(&self.probe);
            let cache = Arc::clone(&self.cache);
            let ttl = self.cache_ttl;
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                let mut results = Vec::new();
                while let Ok(target) = rx.recv().await {
                    let result = cache
                        .get_or_compute(&target, ttl, || async { probe.probe_url(&target).await })
                        .await;

                    log_result(&result, verbose);
                    if let Some(counter) = &progress {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    results.push(result);
                }
                results
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(mut batch) => results.append(&mut batch),
                Err(e) => warn!(error = %e, "link worker panicked"),
            }
        }

        let summary = LinkSummary::from_results(&results);
        info!(
            reachable = summary.reachable_count,
            unreachable = summary.unreachable_count,
            errors = summary.error_count,
            "link check complete"
        );
        (results, summary)
    }
}

/// Collects the distinct fetchable targets from a reference batch,
/// preserving first-seen order.
pub(crate) fn distinct_link_targets(refs: &[Reference]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for reference in refs {
        if let Some(target) = reference.link_target() {
            if seen.insert(target.clone()) {
                targets.push(target);
            }
        }
    }
    targets
}

fn log_result(result: &CheckResult, verbose: bool) {
    if verbose {
        info!(
            target = %result.identifier,
            reachable = result.reachable,
            status = ?result.status_code,
            error = ?result.error,
            "link checked"
        );
    } else {
        debug!(
            target = %result.identifier,
            reachable = result.reachable,
            status = ?result.status_code,
            error = ?result.error,
            "link checked"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::reference::RefKind;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use crate::verify::rate_limiter::RateLimiter;

    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    fn checker(concurrency: usize) -> LinkChecker {
        let probe = Arc::new(
            HttpProbe::new(Duration::from_secs(5), Arc::new(RateLimiter::disabled())).unwrap(),
        );
        LinkChecker::new(probe, Arc::new(ResultCache::new()), concurrency, TTL).unwrap()
    }

    async fn mount_head_ok(server: &MockServer, route: &str) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    // ==================== distinct_link_targets Tests ====================

    #[test]
    fn test_distinct_targets_skips_dois() {
        let refs = vec![
            Reference::doi("10.1234/example", None),
            Reference::from_url("http://example.com/a", None),
        ];
        assert_eq!(distinct_link_targets(&refs), vec!["http://example.com/a"]);
    }

    #[test]
    fn test_distinct_targets_collapses_duplicates() {
        let refs = vec![
            Reference::from_url("http://example.com/a", None),
            Reference::from_url("http://example.com/b", None),
            Reference::from_url("http://example.com/a", None),
        ];
        assert_eq!(
            distinct_link_targets(&refs),
            vec!["http://example.com/a", "http://example.com/b"]
        );
    }

    #[test]
    fn test_distinct_targets_duplicate_pages_collapse() {
        let refs = vec![
            Reference::new("http://example.com/a", RefKind::Url, Some(1)),
            Reference::new("http://example.com/a", RefKind::Url, Some(7)),
        ];
        assert_eq!(distinct_link_targets(&refs).len(), 1);
    }

    #[test]
    fn test_distinct_targets_maps_arxiv_to_abs_url() {
        let refs = vec![Reference::arxiv("2101.00001", None)];
        assert_eq!(
            distinct_link_targets(&refs),
            vec!["https://arxiv.org/abs/2101.00001"]
        );
    }

    // ==================== LinkSummary Tests ====================

    #[test]
    fn test_summary_partitions_outcomes() {
        use crate::verify::error::ErrorKind;

        let results = vec![
            CheckResult::reachable("http://a", 200, None),
            CheckResult::reachable("http://b", 301, None),
            CheckResult::http_failure("http://c", 404, None, None),
            CheckResult::transport_failure("http://d", ErrorKind::Network, None),
            CheckResult::http_failure("http://e", 429, None, Some(ErrorKind::RateLimited)),
        ];
        let summary = LinkSummary::from_results(&results);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.reachable_count, 2);
        assert_eq!(summary.unreachable_count, 1);
        assert_eq!(summary.error_count, 2);
        assert_eq!(
            summary.reachable_count + summary.unreachable_count + summary.error_count,
            summary.total
        );
    }

    #[test]
    fn test_summary_empty_batch_is_all_zero() {
        let summary = LinkSummary::from_results(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.reachable_count, 0);
        assert_eq!(summary.unreachable_count, 0);
        assert_eq!(summary.error_count, 0);
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_new_rejects_zero_concurrency() {
        let probe = Arc::new(
            HttpProbe::new(Duration::from_secs(5), Arc::new(RateLimiter::disabled())).unwrap(),
        );
        let result = LinkChecker::new(probe, Arc::new(ResultCache::new()), 0, TTL);
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidConcurrency { value: 0, .. })
        ));
    }

    #[test]
    fn test_new_rejects_excess_concurrency() {
        let probe = Arc::new(
            HttpProbe::new(Duration::from_secs(5), Arc::new(RateLimiter::disabled())).unwrap(),
        );
        let result = LinkChecker::new(
            probe,
            Arc::new(ResultCache::new()),
            MAX_LINK_CONCURRENCY + 1,
            TTL,
        );
        assert!(result.is_err());
    }

    // ==================== check_references Tests ====================

    #[tokio::test]
    async fn test_check_references_empty_batch() {
        let (results, summary) = checker(5).check_references(&[], false).await;
        assert!(results.is_empty());
        assert_eq!(summary.total, 0);
    }

    #[tokio::test]
    async fn test_check_references_doi_only_batch_makes_no_calls() {
        let refs = vec![Reference::doi("10.1234/a", None), Reference::doi("10.1234/b", None)];
        let (results, summary) = checker(5).check_references(&refs, false).await;
        assert!(results.is_empty());
        assert_eq!(summary.total, 0);
    }

    #[tokio::test]
    async fn test_check_references_result_count_matches_distinct_urls() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_head_ok(&mock_server, "/a").await;
        mount_head_ok(&mock_server, "/b").await;

        let refs = vec![
            Reference::from_url(format!("{}/a", mock_server.uri()), None),
            Reference::from_url(format!("{}/b", mock_server.uri()), None),
            Reference::from_url(format!("{}/a", mock_server.uri()), None),
            Reference::from_url(format!("{}/a", mock_server.uri()), None),
        ];
        let (results, summary) = checker(5).check_references(&refs, false).await;

        assert_eq!(results.len(), 2, "duplicates must collapse");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.reachable_count, 2);
    }

    #[tokio::test]
    async fn test_check_references_duplicate_probes_hit_network_once() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("HEAD"))
            .and(path("/once"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/once", mock_server.uri());
        let refs: Vec<Reference> = (0..20).map(|_| Reference::from_url(&url, None)).collect();
        let (results, _) = checker(8).check_references(&refs, false).await;

        assert_eq!(results.len(), 1);
        // expect(1) verified on mock server drop
    }

    #[tokio::test]
    async fn test_check_references_cache_survives_across_batches() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("HEAD"))
            .and(path("/cached"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let checker = checker(2);
        let refs = vec![Reference::from_url(
            format!("{}/cached", mock_server.uri()),
            None,
        )];

        let (first, _) = checker.check_references(&refs, false).await;
        let (second, _) = checker.check_references(&refs, false).await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(second[0].reachable);
    }

    #[tokio::test]
    async fn test_check_references_mixed_outcomes() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_head_ok(&mock_server, "/live").await;
        Mock::given(method("HEAD"))
            .and(path("/dead"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let refs = vec![
            Reference::from_url(format!("{}/live", mock_server.uri()), None),
            Reference::from_url(format!("{}/dead", mock_server.uri()), None),
        ];
        let (results, summary) = checker(2).check_references(&refs, false).await;

        assert_eq!(results.len(), 2);
        assert_eq!(summary.reachable_count, 1);
        assert_eq!(summary.unreachable_count, 1);
        assert_eq!(summary.error_count, 0);
    }

    #[tokio::test]
    async fn test_check_references_pool_smaller_than_batch() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        for route in ["/p1", "/p2", "/p3", "/p4", "/p5", "/p6"] {
            mount_head_ok(&mock_server, route).await;
        }

        let refs: Vec<Reference> = (1..=6)
            .map(|i| Reference::from_url(format!("{}/p{i}", mock_server.uri()), None))
            .collect();
        let (results, summary) = checker(2).check_references(&refs, false).await;

        assert_eq!(results.len(), 6, "two workers must drain the whole queue");
        assert_eq!(summary.reachable_count, 6);
    }

    #[tokio::test]
    async fn test_check_references_increments_progress_counter() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_head_ok(&mock_server, "/a").await;
        mount_head_ok(&mock_server, "/b").await;

        let counter = Arc::new(AtomicUsize::new(0));
        let checker = checker(2).with_progress_counter(Arc::clone(&counter));
        let refs = vec![
            Reference::from_url(format!("{}/a", mock_server.uri()), None),
            Reference::from_url(format!("{}/b", mock_server.uri()), None),
        ];
        checker.check_references(&refs, false).await;

        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }
}
