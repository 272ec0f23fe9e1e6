//! Landing-page strategy - retraction notices on the publisher's page.
//!
//! The [`LandingPageStrategy`] fetches the page a DOI resolves to and scans
//! the body for explicit retraction notice phrases. It backs up the CrossRef
//! strategy for publishers that post a notice on the article page without
//! updating the registered metadata.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::verify::HttpProbe;

use super::{ConfidenceSource, RetractionSignal, RetractionStrategy, StrategyOutcome};

/// Phrases that unambiguously mark a landing page as a retraction notice.
///
/// Deliberately narrow: a page merely mentioning the word "retraction"
/// (a references section, a news item) must not trigger a positive.
const STRONG_INDICATORS: [&str; 5] = [
    "this article has been retracted",
    "this paper has been retracted",
    "retraction notice",
    "withdrawn by the author",
    "article withdrawn",
];

/// Detects retractions from the DOI resolver landing page.
#[derive(Debug, Default, Clone, Copy)]
pub struct LandingPageStrategy;

impl LandingPageStrategy {
    /// Creates a new landing-page strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RetractionStrategy for LandingPageStrategy {
    fn name(&self) -> &'static str {
        "landing-page"
    }

    fn service_key(&self, probe: &HttpProbe) -> String {
        probe.doi_service_key()
    }

    #[tracing::instrument(skip(self, probe), fields(strategy = "landing-page", doi = %doi))]
    async fn attempt(&self, doi: &str, probe: &HttpProbe) -> StrategyOutcome {
        match probe.probe_landing_page(doi).await {
            Ok(Some(body)) => match scan_body(&body) {
                Some(indicator) => {
                    debug!(indicator, "retraction notice found on landing page");
                    StrategyOutcome::Confirmed(RetractionSignal {
                        source: ConfidenceSource::LandingPageScan,
                        title: None,
                        journal: None,
                        notice_url: Some(probe.landing_url(doi)),
                    })
                }
                None => {
                    debug!("no retraction notice on landing page");
                    StrategyOutcome::Inconclusive
                }
            },
            Ok(None) => {
                debug!("landing page not available");
                StrategyOutcome::Inconclusive
            }
            Err(kind) => {
                warn!(%kind, "landing page fetch failed");
                StrategyOutcome::Failed(kind)
            }
        }
    }
}

/// Scans a landing page body for a strong retraction indicator.
fn scan_body(body: &str) -> Option<&'static str> {
    let content = body.to_lowercase();
    STRONG_INDICATORS
        .iter()
        .copied()
        .find(|phrase| content.contains(phrase))
}
