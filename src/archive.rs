//! Snapshot submission to a web archive.
//!
//! [`ArchiveClient`] submits URLs to the Wayback Machine's save endpoint so
//! that references stay citable after the live page rots. Submission is
//! strictly sequential and paced through the shared [`RateLimiter`]: the
//! archive is one service, and hammering it gets the whole batch throttled.
//!
//! Archiving is best-effort. Per-URL failures are returned as values and
//! never abort the rest of a batch.

use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

use crate::user_agent;
use crate::verify::constants::MAX_REDIRECTS;
use crate::verify::{
    ConfigurationError, ErrorKind, RateLimiter, parse_retry_after, service_key_for_url,
};

/// Default base URL of the archive service.
const ARCHIVE_BASE: &str = "https://web.archive.org";

/// Why a single URL could not be archived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// The archive answered an error status for the save request.
    #[error("archive service refused (status {status})")]
    Refused {
        /// The HTTP status the save endpoint answered.
        status: u16,
    },
    /// The archive answered success but named no snapshot location.
    #[error("archive response carried no snapshot location")]
    NoSnapshot,
    /// The save request never produced a response.
    #[error("{0}")]
    Transport(ErrorKind),
}

/// Outcome of one submission, kept alongside the URL it was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    /// The URL that was submitted.
    pub url: String,
    /// The snapshot URL, or why none was produced.
    pub result: Result<String, ArchiveError>,
}

/// Client for the web-archive save endpoint.
///
/// Cheap to construct once per run; holds its own `reqwest` client since the
/// archive wants a longer timeout than reachability probes (a save request
/// crawls the page before answering).
#[derive(Debug)]
pub struct ArchiveClient {
    client: Client,
    limiter: Arc<RateLimiter>,
    base: String,
}

impl ArchiveClient {
    /// Creates a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidTimeout`] for a zero timeout and
    /// [`ConfigurationError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(timeout: Duration, limiter: Arc<RateLimiter>) -> Result<Self, ConfigurationError> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout);
        }

        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(user_agent::default_probe_user_agent())
            .build()
            .map_err(ConfigurationError::client_build)?;

        Ok(Self {
            client,
            limiter,
            base: ARCHIVE_BASE.to_string(),
        })
    }

    /// Points submissions at a custom archive base URL.
    ///
    /// Primarily used for testing with mock servers.
    #[must_use]
    pub fn with_base(mut self, base_url: impl Into<String>) -> Self {
        self.base = base_url.into();
        self
    }

    /// The rate-limiter service key for archive traffic.
    #[must_use]
    pub fn service_key(&self) -> String {
        service_key_for_url(&self.base)
    }

    /// Submits one URL for archiving and returns the snapshot URL.
    ///
    /// URLs already hosted on the archive are returned unchanged without a
    /// request. The snapshot location comes from the `Content-Location`
    /// header of the save response; relative locations are resolved against
    /// the archive base.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Refused`] when the save endpoint answers an error
    /// status, [`ArchiveError::NoSnapshot`] when it answers success without
    /// a snapshot location, and [`ArchiveError::Transport`] when the request
    /// itself fails.
    #[instrument(skip(self))]
    pub async fn archive_url(&self, url: &str) -> Result<String, ArchiveError> {
        if service_key_for_url(url) == self.service_key() {
            trace!("URL already points at the archive");
            return Ok(url.to_string());
        }

        self.limiter.acquire(&self.service_key()).await;

        let save_url = format!("{}/save/{}", self.base, url);
        trace!(save_url = %save_url, "submitting save request");

        let response = self.client.get(&save_url).send().await.map_err(|e| {
            let kind = ErrorKind::from_transport_error(&e);
            debug!(error = %e, kind = %kind, "save request failed");
            ArchiveError::Transport(kind)
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.record_throttle(&response);
            return Err(ArchiveError::Transport(ErrorKind::RateLimited));
        }
        if !status.is_success() {
            debug!(status = status.as_u16(), "archive refused the save request");
            return Err(ArchiveError::Refused {
                status: status.as_u16(),
            });
        }

        let location = response
            .headers()
            .get(reqwest::header::CONTENT_LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ArchiveError::NoSnapshot)?;

        let snapshot = if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}{}", self.base, location)
        };
        debug!(snapshot = %snapshot, "URL archived");
        Ok(snapshot)
    }

    /// Submits a batch of URLs sequentially, preserving order.
    ///
    /// One failed submission never stops the rest; each outcome carries its
    /// own result. One info or warn line is logged per URL.
    #[instrument(skip(self, urls), fields(urls = urls.len()))]
    pub async fn archive_all(&self, urls: &[String]) -> Vec<ArchiveOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            let result = self.archive_url(url).await;
            match &result {
                Ok(snapshot) => info!(url = %url, snapshot = %snapshot, "archived"),
                Err(error) => warn!(url = %url, error = %error, "archiving failed"),
            }
            outcomes.push(ArchiveOutcome {
                url: url.clone(),
                result,
            });
        }
        outcomes
    }

    /// Folds a 429 answer's Retry-After header into the rate limiter.
    fn record_throttle(&self, response: &reqwest::Response) {
        let service = self.service_key();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        warn!(
            service = %service,
            retry_after_secs = retry_after.map(|d| d.as_secs()),
            "archive answered 429 Too Many Requests"
        );
        if let Some(delay) = retry_after {
            self.limiter.record_rate_limit(&service, delay);
        }
    }
}
