//! Reference extraction from plain text.
//!
//! Text pulled out of a PDF wraps mid-URL, hyphenates path segments, and
//! separates pages with form feeds. Extraction heals those artifacts first,
//! then runs the URL, arXiv, and DOI extractors and classifies every hit
//! into a [`Reference`].
//!
//! # Example
//!
//! ```
//! use refcheck_core::extract::extract_references;
//! use refcheck_core::RefKind;
//!
//! let refs = extract_references("See https://example.com/paper.pdf and doi:10.1234/ex12");
//! assert_eq!(refs.len(), 2);
//! assert_eq!(refs[0].kind, RefKind::PdfLink);
//! assert_eq!(refs[1].kind, RefKind::Doi);
//! ```

mod doi;
mod url;

pub use doi::extract_dois;
pub use url::{extract_arxiv_ids, extract_urls};

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::reference::{RefKind, Reference};

/// Rejoins URLs hyphenated at a line break: `http://a.com/some-\npath`.
#[allow(clippy::expect_used)]
static HYPHEN_WRAP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://\S+)-\s*\n\s*([a-zA-Z0-9])")
        .expect("hyphen wrap regex is valid") // Static pattern, safe to panic
});

/// Rejoins URLs split at a line break when the continuation does not look
/// like the start of an unrelated sentence.
#[allow(clippy::expect_used)]
static URL_WRAP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://\S*)\s*\n\s*([^\s\w]\S*|[0-9]\S*)")
        .expect("URL wrap regex is valid") // Static pattern, safe to panic
});

/// Rejoins domains split before their TLD: `example.\ncom`.
#[allow(clippy::expect_used)]
static DOMAIN_WRAP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"(?i)([a-zA-Z0-9-]+)\.\s*\n\s*((?:{})\b)", url::COMMON_TLDS);
    Regex::new(&pattern).expect("domain wrap regex is valid") // Static pattern, safe to panic
});

/// Rejoins `www.` split from its domain: `www.\nexample.com`.
#[allow(clippy::expect_used)]
static WWW_WRAP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)www\.\s*\n\s*([a-zA-Z0-9-]+)").expect("www wrap regex is valid") // Static pattern, safe to panic
});

/// Rejoins paths split right after the domain: `example.com/\ndocs`.
#[allow(clippy::expect_used)]
static PATH_WRAP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})/\s*\n\s*(\S+)")
        .expect("path wrap regex is valid") // Static pattern, safe to panic
});

/// Collapses runs of spaces and tabs.
#[allow(clippy::expect_used)]
static SPACE_RUN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]+").expect("space run regex is valid") // Static pattern, safe to panic
});

/// Collapses stacked blank lines to a single paragraph break.
#[allow(clippy::expect_used)]
static BLANK_LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\s*\n").expect("blank line regex is valid") // Static pattern, safe to panic
});

/// Extracts references from raw text.
///
/// This is the main entry point for the extraction module. The text is
/// healed first, then scanned for URLs, arXiv identifiers, and DOIs. Each
/// hit becomes a [`Reference`]; URL-shaped DOI and arXiv citations are
/// rerouted to their identifier kinds, and `.pdf` targets are classified as
/// PDF links.
///
/// # Arguments
///
/// * `input` - Raw text that may contain URLs, DOIs, arXiv identifiers, or a mix
///
/// # Behavior
///
/// - Empty input returns an empty result (not an error)
/// - The same identifier cited several times yields a single reference
/// - Candidates that fail validation are logged and dropped, never fatal
/// - References carry `page: None`; page numbers are the caller's concern
///
/// # Example
///
/// ```
/// use refcheck_core::extract::extract_references;
///
/// let refs = extract_references(r#"
/// References:
/// 1. https://arxiv.org/abs/2101.00001
/// 2. Smith, J. (2024). Some Paper. doi:10.1234/jx.55
/// "#);
///
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].identifier, "2101.00001");
/// assert_eq!(refs[1].identifier, "10.1234/jx.55");
/// ```
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn extract_references(input: &str) -> Vec<Reference> {
    let mut references = Vec::new();

    if input.trim().is_empty() {
        debug!("empty input, nothing to extract");
        return references;
    }

    let healed = heal_line_breaks(input);
    let mut seen: HashSet<String> = HashSet::new();

    for candidate in extract_urls(&healed) {
        let reference = classify_url_candidate(candidate);
        if seen.insert(reference.identifier.clone()) {
            references.push(reference);
        }
    }

    for id in extract_arxiv_ids(&healed) {
        if seen.insert(id.clone()) {
            references.push(Reference::arxiv(id, None));
        }
    }

    for doi in extract_dois(&healed) {
        if seen.insert(doi.clone()) {
            references.push(Reference::doi(doi, None));
        }
    }

    let url_count = references
        .iter()
        .filter(|r| matches!(r.kind, RefKind::Url | RefKind::PdfLink))
        .count();
    let arxiv_count = references.iter().filter(|r| r.kind == RefKind::Arxiv).count();
    let doi_count = references.iter().filter(|r| r.kind == RefKind::Doi).count();
    info!(
        urls = url_count,
        arxiv = arxiv_count,
        dois = doi_count,
        total = references.len(),
        "Extraction complete"
    );

    references
}

/// Repairs text artifacts that break identifiers across lines.
///
/// PDF text layers wrap long URLs, hyphenate path segments, and emit form
/// feeds between pages. Each repair only fires on patterns that cannot be
/// ordinary prose, so regular paragraphs pass through unchanged.
///
/// # Examples
///
/// ```
/// use refcheck_core::extract::heal_line_breaks;
///
/// let healed = heal_line_breaks("https://example.com/very-\nlong-path");
/// assert_eq!(healed, "https://example.com/verylong-path");
/// ```
#[must_use]
pub fn heal_line_breaks(input: &str) -> String {
    // Form feeds are page breaks in extracted text
    let healed = input.replace('\x0c', " ");
    let healed = HYPHEN_WRAP_PATTERN.replace_all(&healed, "$1$2");
    let healed = URL_WRAP_PATTERN.replace_all(&healed, "$1$2");
    let healed = DOMAIN_WRAP_PATTERN.replace_all(&healed, "$1.$2");
    let healed = WWW_WRAP_PATTERN.replace_all(&healed, "www.$1");
    let healed = PATH_WRAP_PATTERN.replace_all(&healed, "$1/$2");
    let healed = SPACE_RUN_PATTERN.replace_all(&healed, " ");
    let healed = BLANK_LINE_PATTERN.replace_all(&healed, "\n\n");
    healed.trim().to_string()
}

/// Builds a reference from a URL candidate, rerouting identifier forms.
///
/// URL-shaped DOI and arXiv citations carry the identifier inside the URL;
/// the reference should point at the identifier itself so downstream checks
/// treat it like any other DOI or arXiv entry.
fn classify_url_candidate(url: String) -> Reference {
    if let Some(doi) = extract_dois(&url).into_iter().next() {
        return Reference::doi(doi, None);
    }
    if let Some(id) = extract_arxiv_ids(&url).into_iter().next() {
        return Reference::arxiv(id, None);
    }
    Reference::from_url(url, None)
}
