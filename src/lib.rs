//! Reference Verification Core Library
//!
//! This library provides the core functionality for the refcheck tool,
//! which takes references cited in documents (URLs, PDF links, DOIs,
//! arXiv IDs) and verifies them: are the links still reachable, and have
//! the cited papers been retracted?
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`extract`] - Reference extraction from raw text
//! - [`verify`] - Link engine, coordinator, and shared HTTP plumbing
//! - [`retraction`] - DOI retraction detection strategy chain
//! - [`report`] - Merged verification report
//! - [`output`] - Text and JSON rendering of reports
//! - [`archive`] - Snapshot submission to the Internet Archive

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod extract;
pub mod output;
pub mod reference;
pub mod report;
pub mod retraction;
pub mod verify;

mod user_agent;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use archive::{ArchiveClient, ArchiveError, ArchiveOutcome};
pub use extract::extract_references;
pub use output::{render_json, render_text};
pub use reference::{RefKind, Reference};
pub use report::Report;
pub use retraction::{ConfidenceSource, RetractionChecker, RetractionSummary, RetractionVerdict};
pub use verify::{
    CheckResult, ConfigurationError, DEFAULT_CACHE_TTL, DEFAULT_LINK_CONCURRENCY,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_RETRACTION_CONCURRENCY, DEFAULT_SERVICE_INTERVAL, ErrorKind,
    LinkSummary, RateLimiter, Verifier, VerifyOptions,
};
