//! Error types for the verification engines.
//!
//! Per-identifier failures are data, not control flow: they are classified
//! into an [`ErrorKind`] and carried inside the owning result value, so one
//! dead link or flaky API call never aborts the rest of a batch. Only
//! [`ConfigurationError`] is fatal, and only at construction time.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classification of a failed check, carried inside result values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// DNS failure, connection refused, or timeout
    Network,
    /// TLS handshake or certificate failure on an https URL
    Tls,
    /// The remote service answered 429 Too Many Requests
    RateLimited,
    /// The remote response body was malformed
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network error"),
            Self::Tls => write!(f, "TLS error"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::Parse => write!(f, "parse error"),
        }
    }
}

impl ErrorKind {
    /// Classifies a transport-level reqwest failure.
    ///
    /// TLS problems become [`ErrorKind::Tls`]; everything else at the
    /// transport layer (DNS, refused connections, timeouts) is
    /// [`ErrorKind::Network`].
    #[must_use]
    pub fn from_transport_error(error: &reqwest::Error) -> Self {
        if is_tls_error(error) {
            Self::Tls
        } else {
            Self::Network
        }
    }
}

/// Checks if a reqwest error is a TLS/certificate error.
fn is_tls_error(error: &reqwest::Error) -> bool {
    // reqwest errors have methods to check error type
    // TLS errors typically appear in the error chain
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

/// Errors that make a verifier unusable, detected at construction time.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Worker count outside the accepted range.
    #[error("invalid concurrency {value}: must be between 1 and {max}")]
    InvalidConcurrency {
        /// The rejected worker count.
        value: usize,
        /// The maximum accepted worker count.
        max: usize,
    },

    /// Per-request timeout of zero makes every probe fail immediately.
    #[error("invalid probe timeout: must be greater than zero")]
    InvalidTimeout,

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

impl ConfigurationError {
    /// Creates an invalid-concurrency error.
    #[must_use]
    pub fn invalid_concurrency(value: usize, max: usize) -> Self {
        Self::InvalidConcurrency { value, max }
    }

    /// Creates a client-build error from a reqwest error.
    #[must_use]
    pub fn client_build(source: reqwest::Error) -> Self {
        Self::ClientBuild { source }
    }
}

/// Validates a worker count against an engine's accepted range.
pub(crate) fn validate_concurrency(value: usize, max: usize) -> Result<(), ConfigurationError> {
    if value == 0 || value > max {
        return Err(ConfigurationError::invalid_concurrency(value, max));
    }
    Ok(())
}
