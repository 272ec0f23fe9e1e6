//! CrossRef metadata strategy - retraction keywords in the publication record.
//!
//! The [`CrossrefMetadataStrategy`] asks the CrossRef works API for a DOI's
//! record and scans the title and subject terms for retraction keywords.
//! CrossRef marks retracted works by prefixing the title ("Retraction: ...",
//! "WITHDRAWN: ...") or tagging the subject, so a keyword hit is treated as
//! a confirmed signal.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::verify::{CrossrefWork, HttpProbe};

use super::{ConfidenceSource, RetractionSignal, RetractionStrategy, StrategyOutcome};

/// Keywords that mark a CrossRef record as retracted or withdrawn.
const RETRACTION_KEYWORDS: [&str; 4] = ["retraction", "retracted", "withdrawn", "withdrawal"];

/// Detects retractions from CrossRef publication metadata.
///
/// This is the primary evidence source: it is cheap (one JSON API call),
/// authoritative, and carries the publication title and journal for the
/// final verdict.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossrefMetadataStrategy;

impl CrossrefMetadataStrategy {
    /// Creates a new CrossRef metadata strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RetractionStrategy for CrossrefMetadataStrategy {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn service_key(&self, probe: &HttpProbe) -> String {
        probe.crossref_service_key()
    }

    #[tracing::instrument(skip(self, probe), fields(strategy = "crossref", doi = %doi))]
    async fn attempt(&self, doi: &str, probe: &HttpProbe) -> StrategyOutcome {
        match probe.probe_crossref_metadata(doi).await {
            Ok(Some(work)) => match scan_work(&work, doi) {
                Some(signal) => StrategyOutcome::Confirmed(signal),
                None => {
                    debug!("no retraction keywords in CrossRef record");
                    StrategyOutcome::Inconclusive
                }
            },
            Ok(None) => {
                debug!("no CrossRef record for DOI");
                StrategyOutcome::Inconclusive
            }
            Err(kind) => {
                warn!(%kind, "CrossRef lookup failed");
                StrategyOutcome::Failed(kind)
            }
        }
    }
}

/// Scans a CrossRef record for retraction keywords.
///
/// The title and the joined subject terms are lowercased before matching;
/// a hit produces a signal carrying the original-case title, the journal
/// name, and the canonical `doi.org` notice URL.
fn scan_work(work: &CrossrefWork, doi: &str) -> Option<RetractionSignal> {
    let title = work.display_title().unwrap_or_default().to_lowercase();
    let subject = work.subject.join(" ").to_lowercase();

    let keyword = RETRACTION_KEYWORDS
        .iter()
        .copied()
        .find(|kw| title.contains(kw) || subject.contains(kw))?;

    debug!(keyword, "retraction keyword found in CrossRef record");
    Some(RetractionSignal {
        source: ConfidenceSource::CrossrefMetadata,
        title: work.display_title().map(str::to_string),
        journal: work.journal().map(str::to_string),
        notice_url: Some(format!("https://doi.org/{doi}")),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use crate::verify::{ErrorKind, RateLimiter};

    use super::*;

    fn probe_for(server: &MockServer) -> HttpProbe {
        HttpProbe::new(Duration::from_secs(5), Arc::new(RateLimiter::disabled()))
            .unwrap()
            .with_crossref_base(server.uri())
    }

    fn work_json(title: &str, subject: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "status": "ok",
            "message": {
                "title": [title],
                "subject": subject,
                "container-title": ["Journal of Examples"]
            }
        })
    }

    async fn mount_work(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path_regex(r"/works/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    // ==================== scan_work Tests ====================

    #[test]
    fn test_scan_finds_keyword_in_title() {
        let work = CrossrefWork {
            title: vec!["Retraction: A Flawed Study".to_string()],
            subject: vec![],
            container_title: vec!["Nature Examples".to_string()],
        };
        let signal = scan_work(&work, "10.1234/x").unwrap();

        assert_eq!(signal.source, ConfidenceSource::CrossrefMetadata);
        assert_eq!(signal.title.as_deref(), Some("Retraction: A Flawed Study"));
        assert_eq!(signal.journal.as_deref(), Some("Nature Examples"));
        assert_eq!(signal.notice_url.as_deref(), Some("https://doi.org/10.1234/x"));
    }

    #[test]
    fn test_scan_finds_keyword_in_subject() {
        let work = CrossrefWork {
            title: vec!["A Perfectly Ordinary Title".to_string()],
            subject: vec!["Oncology".to_string(), "Retracted Publication".to_string()],
            container_title: vec![],
        };
        let signal = scan_work(&work, "10.1234/x").unwrap();
        assert_eq!(signal.source, ConfidenceSource::CrossrefMetadata);
        assert_eq!(signal.journal, None);
    }

    #[test]
    fn test_scan_is_case_insensitive() {
        let work = CrossrefWork {
            title: vec!["WITHDRAWN: Results We Regret".to_string()],
            subject: vec![],
            container_title: vec![],
        };
        assert!(scan_work(&work, "10.1234/x").is_some());
    }

    #[test]
    fn test_scan_clean_record_yields_nothing() {
        let work = CrossrefWork {
            title: vec!["A Sound and Reproducible Study".to_string()],
            subject: vec!["Physics".to_string()],
            container_title: vec![],
        };
        assert!(scan_work(&work, "10.1234/x").is_none());
    }

    #[test]
    fn test_scan_empty_record_yields_nothing() {
        let work = CrossrefWork {
            title: vec![],
            subject: vec![],
            container_title: vec![],
        };
        assert!(scan_work(&work, "10.1234/x").is_none());
    }

    // ==================== attempt Tests ====================

    #[tokio::test]
    async fn test_attempt_confirms_on_retraction_title() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_work(
            &mock_server,
            work_json("Retraction: A Flawed Study", &["Biology"]),
        )
        .await;

        let probe = probe_for(&mock_server);
        let outcome = CrossrefMetadataStrategy::new()
            .attempt("10.1234/flawed", &probe)
            .await;

        let StrategyOutcome::Confirmed(signal) = outcome else {
            panic!("expected confirmed outcome, got {outcome:?}");
        };
        assert_eq!(signal.notice_url.as_deref(), Some("https://doi.org/10.1234/flawed"));
    }

    #[tokio::test]
    async fn test_attempt_inconclusive_on_clean_record() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_work(&mock_server, work_json("A Fine Study", &["Physics"])).await;

        let probe = probe_for(&mock_server);
        let outcome = CrossrefMetadataStrategy::new()
            .attempt("10.1234/fine", &probe)
            .await;

        assert_eq!(outcome, StrategyOutcome::Inconclusive);
    }

    #[tokio::test]
    async fn test_attempt_inconclusive_when_doi_unknown() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path_regex(r"/works/.+"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let probe = probe_for(&mock_server);
        let outcome = CrossrefMetadataStrategy::new()
            .attempt("10.9999/unknown", &probe)
            .await;

        assert_eq!(outcome, StrategyOutcome::Inconclusive);
    }

    #[tokio::test]
    async fn test_attempt_fails_on_malformed_payload() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path_regex(r"/works/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&mock_server)
            .await;

        let probe = probe_for(&mock_server);
        let outcome = CrossrefMetadataStrategy::new()
            .attempt("10.1234/x", &probe)
            .await;

        assert_eq!(outcome, StrategyOutcome::Failed(ErrorKind::Parse));
    }

    #[tokio::test]
    async fn test_attempt_fails_when_throttled() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path_regex(r"/works/.+"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let probe = probe_for(&mock_server);
        let outcome = CrossrefMetadataStrategy::new()
            .attempt("10.1234/x", &probe)
            .await;

        assert_eq!(outcome, StrategyOutcome::Failed(ErrorKind::RateLimited));
    }
}
