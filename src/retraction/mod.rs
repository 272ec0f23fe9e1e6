//! Retraction detection pipeline for DOI references.
//!
//! This module answers one question per DOI: has the publication behind it
//! been retracted or withdrawn? Evidence is gathered by a fixed-priority
//! chain of strategies, each consulting a different source.
//!
//! # Architecture
//!
//! - [`RetractionStrategy`] - Async trait that individual evidence sources implement
//! - [`CrossrefMetadataStrategy`] - Keyword scan over the CrossRef publication record
//! - [`LandingPageStrategy`] - Phrase scan over the DOI resolver landing page
//! - [`RetractionChecker`] - Worker-pool runner applying the chain per DOI
//! - [`StrategyOutcome`] - Result enum from individual strategy attempts
//! - [`RetractionVerdict`] - Final per-DOI answer
//!
//! The chain short-circuits on the first confirmed signal; an inconclusive
//! or failed strategy falls through to the next. A verdict carries an error
//! only when every strategy failed outright.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use refcheck_core::retraction::RetractionChecker;
//! use refcheck_core::verify::{HttpProbe, RateLimiter, ResultCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
//! let probe = Arc::new(HttpProbe::new(Duration::from_secs(10), Arc::clone(&limiter))?);
//! let checker = RetractionChecker::new(
//!     probe,
//!     limiter,
//!     Arc::new(ResultCache::new()),
//!     2,
//!     Duration::from_secs(900),
//! )?;
//!
//! let dois = vec!["10.1126/science.aac4716".to_string()];
//! let verdicts = checker.check_dois(&dois, false).await;
//! for verdict in verdicts.values() {
//!     println!("{}: retracted={}", verdict.doi, verdict.is_retracted);
//! }
//! # Ok(())
//! # }
//! ```

mod checker;
mod crossref;
mod landing_page;

pub use checker::{RetractionChecker, RetractionSummary};
pub use crossref::CrossrefMetadataStrategy;
pub use landing_page::LandingPageStrategy;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::verify::{ErrorKind, HttpProbe};

/// Which evidence source confirmed a retraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// The CrossRef publication record carried retraction keywords.
    CrossrefMetadata,
    /// The DOI landing page carried a retraction notice phrase.
    LandingPageScan,
    /// No source confirmed a retraction.
    None,
}

impl std::fmt::Display for ConfidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CrossrefMetadata => write!(f, "crossref_metadata"),
            Self::LandingPageScan => write!(f, "landing_page_scan"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Evidence produced by a strategy that confirmed a retraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetractionSignal {
    /// The source that produced this signal.
    pub source: ConfidenceSource,
    /// Publication title, when the source exposes one.
    pub title: Option<String>,
    /// Journal name, when the source exposes one.
    pub journal: Option<String>,
    /// URL of the retraction notice or landing page.
    pub notice_url: Option<String>,
}

/// Result of a single strategy's attempt on one DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// The source confirmed a retraction.
    Confirmed(RetractionSignal),
    /// The source answered but carried no retraction evidence.
    Inconclusive,
    /// The source could not be consulted at all.
    Failed(ErrorKind),
}

/// Final per-DOI answer from the retraction chain.
///
/// Immutable once produced. `error` is populated only when every strategy
/// failed; a DOI that was checked successfully and shows no evidence is
/// "clean" (`is_retracted=false`, `error=None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetractionVerdict {
    /// The DOI that was checked, as submitted.
    pub doi: String,
    /// Whether any source confirmed a retraction.
    pub is_retracted: bool,
    /// The source behind a positive answer, `None` otherwise.
    pub confidence_source: ConfidenceSource,
    /// Publication title, when known.
    pub title: Option<String>,
    /// Journal name, when known.
    pub journal: Option<String>,
    /// URL of the retraction notice or landing page, when known.
    pub notice_url: Option<String>,
    /// Failure classification, set only when no source could be consulted.
    pub error: Option<ErrorKind>,
    /// When the check completed.
    pub checked_at: DateTime<Utc>,
}

impl RetractionVerdict {
    /// Creates a verdict for a confirmed retraction.
    #[must_use]
    pub fn retracted(doi: impl Into<String>, signal: RetractionSignal) -> Self {
        Self {
            doi: doi.into(),
            is_retracted: true,
            confidence_source: signal.source,
            title: signal.title,
            journal: signal.journal,
            notice_url: signal.notice_url,
            error: None,
            checked_at: Utc::now(),
        }
    }

    /// Creates a verdict for a DOI that was checked and shows no evidence.
    #[must_use]
    pub fn clean(doi: impl Into<String>) -> Self {
        Self {
            doi: doi.into(),
            is_retracted: false,
            confidence_source: ConfidenceSource::None,
            title: None,
            journal: None,
            notice_url: None,
            error: None,
            checked_at: Utc::now(),
        }
    }

    /// Creates a verdict for a DOI that could not be checked.
    #[must_use]
    pub fn failed(doi: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            doi: doi.into(),
            is_retracted: false,
            confidence_source: ConfidenceSource::None,
            title: None,
            journal: None,
            notice_url: None,
            error: Some(kind),
            checked_at: Utc::now(),
        }
    }
}

/// Trait that all retraction evidence sources implement.
///
/// Strategies are tried in registration order; the checker acquires the
/// rate limiter under [`service_key`](RetractionStrategy::service_key)
/// before each attempt, so implementations only talk to their service.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn RetractionStrategy>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required for the chain pattern.
#[async_trait]
pub trait RetractionStrategy: Send + Sync {
    /// Returns the strategy's name (e.g., "crossref", "landing-page").
    fn name(&self) -> &str;

    /// Returns the rate-limiter key for the service this strategy consults.
    fn service_key(&self, probe: &HttpProbe) -> String;

    /// Attempts to determine retraction status for one DOI.
    async fn attempt(&self, doi: &str, probe: &HttpProbe) -> StrategyOutcome;
}
