//! HTTP probing for link reachability and retraction evidence.
//!
//! # Overview
//!
//! [`HttpProbe`] owns the single `reqwest` client shared by both verification
//! engines and exposes three operations:
//!
//! - [`probe_url`](HttpProbe::probe_url) - reachability and TLS check for one URL
//! - [`probe_crossref_metadata`](HttpProbe::probe_crossref_metadata) - publication
//!   record lookup on the CrossRef works API
//! - [`probe_landing_page`](HttpProbe::probe_landing_page) - body fetch of a DOI's
//!   resolver landing page
//!
//! None of them ever panics or propagates a transport fault as a process
//! failure: `probe_url` folds every outcome into a [`CheckResult`], and the
//! two retraction probes classify failures into [`ErrorKind`] values the
//! strategy layer turns into per-DOI verdicts.
//!
//! # TLS policy
//!
//! A TLS handshake or certificate failure on an https URL is reported as
//! `reachable=false` with `ssl_valid=Some(false)` and `error=Some(Tls)`. A
//! completed https exchange reports `ssl_valid=Some(true)` regardless of the
//! HTTP status; plain http URLs and failures before the handshake report
//! `ssl_valid=None` (validity unknown).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::user_agent;

use super::constants::MAX_REDIRECTS;
use super::error::{ConfigurationError, ErrorKind};
use super::rate_limiter::{RateLimiter, parse_retry_after, service_key_for_url};

/// Default base URL for the CrossRef works API.
const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Default base URL for the DOI resolver.
const DOI_RESOLVER_BASE: &str = "https://doi.org";

/// Outcome of a single link reachability check.
///
/// Immutable once produced; failures live in the `error` field rather than in
/// a `Result`, so one dead link never disturbs the rest of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// The identifier that was checked, as submitted.
    pub identifier: String,
    /// Whether the target answered with a 2xx/3xx status.
    pub reachable: bool,
    /// The final HTTP status, when a response was received.
    pub status_code: Option<u16>,
    /// TLS certificate validity: `Some(true)` after a completed https
    /// exchange, `Some(false)` on a certificate/handshake failure, `None`
    /// when TLS was never evaluated (plain http, or failure before the
    /// handshake).
    pub ssl_valid: Option<bool>,
    /// Failure classification, when the check did not produce a usable status.
    pub error: Option<ErrorKind>,
    /// When the check completed.
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    /// Creates a result for a URL that answered a terminal 2xx/3xx status.
    #[must_use]
    pub fn reachable(identifier: impl Into<String>, status: u16, ssl_valid: Option<bool>) -> Self {
        Self {
            identifier: identifier.into(),
            reachable: true,
            status_code: Some(status),
            ssl_valid,
            error: None,
            checked_at: Utc::now(),
        }
    }

    /// Creates a result for a URL that answered a 4xx/5xx status.
    #[must_use]
    pub fn http_failure(
        identifier: impl Into<String>,
        status: u16,
        ssl_valid: Option<bool>,
        error: Option<ErrorKind>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            reachable: false,
            status_code: Some(status),
            ssl_valid,
            error,
            checked_at: Utc::now(),
        }
    }

    /// Creates a result for a URL that produced no HTTP response at all.
    #[must_use]
    pub fn transport_failure(
        identifier: impl Into<String>,
        error: ErrorKind,
        ssl_valid: Option<bool>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            reachable: false,
            status_code: None,
            ssl_valid,
            error: Some(error),
            checked_at: Utc::now(),
        }
    }
}

/// Publication record subset returned by the CrossRef works API.
///
/// Only the fields the retraction strategies inspect are deserialized; the
/// rest of the (large) CrossRef payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CrossrefWork {
    /// Work title(s); the first entry is the display title.
    #[serde(default)]
    pub title: Vec<String>,
    /// Subject classification terms.
    #[serde(default)]
    pub subject: Vec<String>,
    /// Journal or container title(s).
    #[serde(default, rename = "container-title")]
    pub container_title: Vec<String>,
}

impl CrossrefWork {
    /// The display title, if the record carries one.
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        self.title.first().map(String::as_str)
    }

    /// The journal name, if the record carries one.
    #[must_use]
    pub fn journal(&self) -> Option<&str> {
        self.container_title.first().map(String::as_str)
    }
}

/// Envelope around the CrossRef works payload.
#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWork,
}

/// Shared HTTP prober for both verification engines.
///
/// Holds the single `reqwest::Client` (connection pool, timeout, redirect
/// policy, User-Agent) plus the rate limiter used to account server-mandated
/// back-off. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct HttpProbe {
    client: Client,
    limiter: Arc<RateLimiter>,
    crossref_base: String,
    doi_base: String,
}

impl HttpProbe {
    /// Creates a probe with the given per-request timeout.
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
            crossref_base: CROSSREF_API_BASE.to_string(),
            doi_base: DOI_RESOLVER_BASE.to_string(),
        })
    }

    /// Points CrossRef lookups at a custom base URL.
    ///
    /// Primarily used for testing with mock servers.
    #[must_use]
    pub fn with_crossref_base(mut self, base_url: impl Into<String>) -> Self {
        self.crossref_base = base_url.into();
        self
    }

    /// Points landing-page fetches at a custom DOI resolver base URL.
    ///
    /// Primarily used for testing with mock servers.
    #[must_use]
    pub fn with_doi_base(mut self, base_url: impl Into<String>) -> Self {
        self.doi_base = base_url.into();
        self
    }

    /// The rate-limiter service key for CrossRef API traffic.
    #[must_use]
    pub fn crossref_service_key(&self) -> String {
        service_key_for_url(&self.crossref_base)
    }

    /// The rate-limiter service key for DOI resolver traffic.
    #[must_use]
    pub fn doi_service_key(&self) -> String {
        service_key_for_url(&self.doi_base)
    }

    /// The resolver URL a DOI's landing page is fetched from.
    #[must_use]
    pub fn landing_url(&self, doi: &str) -> String {
        format!("{}/{}", self.doi_base, doi)
    }

    /// Checks a single URL for reachability.
    ///
    /// The URL is normalized first (scheme defaulted to `http://` when
    /// missing, percent-encoding fixed up by the `url` crate). The probe
    /// issues a HEAD request and falls back to GET when the server rejects
    /// the method (405/501). Outcome classification:
    ///
    /// - 2xx/3xx terminal status: `reachable=true`
    /// - 4xx/5xx: `reachable=false` with the status recorded; 429 additionally
    ///   carries [`ErrorKind::RateLimited`] and folds any Retry-After answer
    ///   into the rate limiter
    /// - connection/DNS/timeout failures: [`ErrorKind::Network`]
    /// - certificate or handshake failures: [`ErrorKind::Tls`]
    ///
    /// This method never fails; every outcome is folded into the returned
    /// [`CheckResult`].
    #[instrument(skip(self))]
    pub async fn probe_url(&self, url: &str) -> CheckResult {
        let target = normalize_url(url);
        let is_https = target.starts_with("https://");
        trace!(target = %target, "probing URL");

        let mut response = self.client.head(&target).send().await;

        // Some servers reject HEAD outright; retry those once with GET so a
        // live page is not misreported as broken.
        if let Ok(resp) = &response {
            if matches!(resp.status().as_u16(), 405 | 501) {
                debug!(target = %target, status = resp.status().as_u16(), "HEAD rejected, retrying with GET");
                response = self.client.get(&target).send().await;
            }
        }

        match response {
            Ok(resp) => {
                let status = resp.status();
                let ssl_valid = is_https.then_some(true);

                if status.is_success() || status.is_redirection() {
                    debug!(status = status.as_u16(), "URL reachable");
                    CheckResult::reachable(url, status.as_u16(), ssl_valid)
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    self.record_throttle(&target, &resp);
                    CheckResult::http_failure(
                        url,
                        status.as_u16(),
                        ssl_valid,
                        Some(ErrorKind::RateLimited),
                    )
                } else {
                    debug!(status = status.as_u16(), "URL answered an error status");
                    CheckResult::http_failure(url, status.as_u16(), ssl_valid, None)
                }
            }
            Err(e) => {
                let kind = ErrorKind::from_transport_error(&e);
                let ssl_valid = (kind == ErrorKind::Tls && is_https).then_some(false);
                debug!(error = %e, kind = %kind, "URL probe failed");
                CheckResult::transport_failure(url, kind, ssl_valid)
            }
        }
    }

    /// Fetches the CrossRef publication record for a DOI.
    ///
    /// Returns `Ok(Some(work))` when the record exists, `Ok(None)` when
    /// CrossRef has no record for the DOI (or answers a non-retryable error
    /// status), and `Err` for transport faults, throttling, and malformed
    /// payloads.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Network`]/[`ErrorKind::Tls`] for transport failures,
    /// [`ErrorKind::RateLimited`] on a 429 answer, [`ErrorKind::Parse`] when
    /// the response body is not the expected JSON shape.
    #[instrument(skip(self))]
    pub async fn probe_crossref_metadata(
        &self,
        doi: &str,
    ) -> Result<Option<CrossrefWork>, ErrorKind> {
        let url = format!("{}/works/{}", self.crossref_base, urlencoding::encode(doi));
        trace!(url = %url, "fetching CrossRef record");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify_transport(&url, &e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.record_throttle(&url, &response);
            return Err(ErrorKind::RateLimited);
        }
        if !status.is_success() {
            debug!(status = status.as_u16(), "CrossRef has no usable record");
            return Ok(None);
        }

        let envelope: CrossrefResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "CrossRef payload did not match expected shape");
            ErrorKind::Parse
        })?;

        Ok(Some(envelope.message))
    }

    /// Fetches the DOI resolver landing page and returns its body text.
    ///
    /// Redirects are followed (publishers host the actual landing page).
    /// Returns `Ok(None)` when the resolver answers a non-200 status, `Err`
    /// for transport faults and throttling.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Network`]/[`ErrorKind::Tls`] for transport failures,
    /// [`ErrorKind::RateLimited`] on a 429 answer.
    #[instrument(skip(self))]
    pub async fn probe_landing_page(&self, doi: &str) -> Result<Option<String>, ErrorKind> {
        let url = self.landing_url(doi);
        trace!(url = %url, "fetching DOI landing page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify_transport(&url, &e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.record_throttle(&url, &response);
            return Err(ErrorKind::RateLimited);
        }
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "landing page not available");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.classify_transport(&url, &e))?;
        Ok(Some(body))
    }

    /// Classifies a transport error, logging it against the URL it hit.
    fn classify_transport(&self, url: &str, error: &reqwest::Error) -> ErrorKind {
        let kind = ErrorKind::from_transport_error(error);
        debug!(url, error = %error, kind = %kind, "request failed");
        kind
    }

    /// Folds a 429 answer's Retry-After header into the rate limiter.
    fn record_throttle(&self, url: &str, response: &Response) {
        let service = service_key_for_url(url);
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        warn!(
            service = %service,
            retry_after_secs = retry_after.map(|d| d.as_secs()),
            "service answered 429 Too Many Requests"
        );
        if let Some(delay) = retry_after {
            self.limiter.record_rate_limit(&service, delay);
        }
    }
}

/// Normalizes a URL for probing.
///
/// Prefixes `http://` when no usable scheme is present (bare hosts like
/// `example.com/page` are common in extracted references) and lets the `url`
/// crate fix up percent-encoding and host casing. Strings that cannot be made
/// parseable are returned trimmed; the subsequent request fails and is
/// classified as a network error.
#[must_use]
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed.to_string(),
        // "localhost:8080/x" parses with scheme "localhost"; anything that is
        // not http(s) gets one chance with a default scheme prefixed.
        _ => match Url::parse(&format!("http://{trimmed}")) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => trimmed.to_string(),
        },
    }
}
