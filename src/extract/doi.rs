//! DOI extraction from text.
//!
//! DOIs are matched in the two forms citations actually use, `doi.org` URLs
//! and `doi:` prefixes. Bare `10.xxxx/...` strings are ignored because they
//! collide with section numbers and IP-like tokens.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

/// Regex pattern for DOIs cited as resolver URLs.
/// Matches `doi.org/...` and `dx.doi.org/...`, with or without a scheme.
#[allow(clippy::expect_used)]
static DOI_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:dx\.)?doi\.org/([0-9]{2}\.[0-9]{4,9}/[^\s,;)\]}>]+)")
        .expect("DOI URL regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for `doi:`-prefixed DOIs.
/// The colon and the following whitespace are both optional, so `DOI: x`,
/// `doi:x`, and `DOI x` all match.
#[allow(clippy::expect_used)]
static DOI_PREFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)doi:?\s*([0-9]{2}\.[0-9]{4,9}/[^\s,;)\]}>]+)")
        .expect("DOI prefix regex is valid") // Static pattern, safe to panic
});

/// Extracts DOIs from text input.
///
/// Finds `doi.org` URLs and `doi:`-prefixed identifiers, strips trailing
/// sentence punctuation, and validates each candidate. Duplicate values are
/// collapsed; the returned order is first-seen, URL forms before prefix
/// forms.
///
/// # Arguments
///
/// * `input` - Text input that may contain DOIs mixed with other content
///
/// # Examples
///
/// ```
/// use refcheck_core::extract::extract_dois;
///
/// let dois = extract_dois("See https://doi.org/10.1038/nature12373 for details");
/// assert_eq!(dois, ["10.1038/nature12373"]);
/// ```
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn extract_dois(input: &str) -> Vec<String> {
    let mut dois = Vec::new();
    let mut seen_values: HashSet<String> = HashSet::new();
    let mut seen_ranges: Vec<(usize, usize)> = Vec::new();

    // Extract resolver URLs first (most specific form)
    for cap in DOI_URL_PATTERN.captures_iter(input) {
        if let Some(full_match) = cap.get(0) {
            seen_ranges.push((full_match.start(), full_match.end()));
            process_candidate(&cap[1], &mut seen_values, &mut dois);
        }
    }

    // Extract doi:-prefixed DOIs
    for cap in DOI_PREFIX_PATTERN.captures_iter(input) {
        if let Some(full_match) = cap.get(0) {
            if overlaps(&seen_ranges, full_match.start(), full_match.end()) {
                continue;
            }
            seen_ranges.push((full_match.start(), full_match.end()));
            process_candidate(&cap[1], &mut seen_values, &mut dois);
        }
    }

    dois
}

/// Check if a range overlaps with any already-seen range.
fn overlaps(seen: &[(usize, usize)], start: usize, end: usize) -> bool {
    seen.iter().any(|&(s, e)| start < e && end > s)
}

/// Cleans and validates a captured candidate, keeping it when new.
fn process_candidate(candidate: &str, seen_values: &mut HashSet<String>, dois: &mut Vec<String>) {
    let cleaned = candidate.trim_end_matches(['.', ',', ';', ':', '!', '?']);
    trace!(candidate = %cleaned, "found DOI candidate");

    if !is_valid_doi(cleaned) {
        debug!(candidate = %cleaned, "dropping invalid DOI candidate");
        return;
    }

    if seen_values.insert(cleaned.to_string()) {
        dois.push(cleaned.to_string());
    }
}

/// Validates a cleaned DOI candidate.
///
/// # Validation rules:
/// - Must start with `10.`
/// - Registrant code must be 4+ digits
/// - Must have a non-empty suffix after `/`
fn is_valid_doi(doi: &str) -> bool {
    let Some(rest) = doi.strip_prefix("10.") else {
        return false;
    };
    let Some((registrant, suffix)) = rest.split_once('/') else {
        return false;
    };
    registrant.len() >= 4
        && registrant.bytes().all(|b| b.is_ascii_digit())
        && !suffix.is_empty()
}
