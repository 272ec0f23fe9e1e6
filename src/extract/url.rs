//! URL and arXiv identifier extraction from text.
//!
//! Scheme'd URLs are matched directly. Bare domains ("see example.com/docs")
//! are common in academic texts, so a second branch matches them against a
//! list of widely used top-level domains.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

/// Maximum accepted URL length; longer candidates are dropped.
pub(crate) const MAX_URL_LENGTH: usize = 2000;

/// Top-level domains recognized when a URL appears without a scheme.
pub(crate) const COMMON_TLDS: &str = "com|net|org|edu|gov|mil|int|aero|asia|biz|cat|coop|info|jobs|mobi|museum|name|post|pro|tel|travel|xxx|io|ai|co|uk|de|jp|fr|au|ca|br|ru|cn|in|mx|it|es|nl|be|ch|se|no|dk|fi|pl|cz|at|hu|gr|pt|ie|ro|bg|hr|si|sk|lt|lv|ee|lu|mt|cy|is|li|ad|mc|sm|va|md|me|rs|mk|ba|al|by|ua|kz|kg|tj|tm|uz|am|az|ge|tr|il|lb|sy|jo|sa|ae|kw|qa|bh|om|ye|iq|ir|af|pk|bd|lk|mv|np|bt|mm|th|la|kh|vn|my|sg|bn|id|ph|tw|kr|kp|mn|hk|mo|fm|pw|mh|mp|gu|as|vi|pr|tc|vg|ag|dm|gd|kn|lc|vc|bb|tt|jm|ht|do|cu|bs|bz|gt|sv|hn|ni|cr|pa|ve|gy|sr|ec|pe|bo|py|uy|ar|cl|fk|gs";

/// Regex pattern for finding URLs in text.
///
/// The first branch matches scheme'd URLs until whitespace or common
/// delimiters. The second matches bare domain-plus-TLD forms; it captures
/// into group 1 and must not fire inside emails or longer words, which the
/// leading character class rules out.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r#"(?i)\bhttps?://[^\s<>"'\]]+|(?:^|[^\w@])((?:[-\w]+\.)+(?:{COMMON_TLDS})\b(?:/(?:[\w.,@?^=%&:/~+#-]*[\w@?^=%&/~+#-])?)?)"#
    );
    Regex::new(&pattern).expect("URL regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for `arxiv:`-prefixed identifiers.
#[allow(clippy::expect_used)]
static ARXIV_PREFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arxiv:\s?([^\s,]+)").expect("arXiv prefix regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for abstract-page URLs like `arxiv.org/abs/2101.00001`.
#[allow(clippy::expect_used)]
static ARXIV_ABS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arxiv\.org/abs/([^\s,]+)").expect("arXiv abs regex is valid") // Static pattern, safe to panic
});

/// Extracts URLs from text input.
///
/// Finds scheme'd HTTP/HTTPS URLs and bare domain forms, cleans trailing
/// punctuation, and screens each candidate for parseability. Candidates are
/// returned as found in the text, duplicates collapsed, first-seen order.
///
/// # Arguments
///
/// * `input` - Text input that may contain URLs mixed with other content
///
/// # Examples
///
/// ```
/// use refcheck_core::extract::extract_urls;
///
/// let urls = extract_urls("Check https://example.com/doc.pdf and www.test.org");
/// assert_eq!(urls, ["https://example.com/doc.pdf", "www.test.org"]);
/// ```
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn extract_urls(input: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for cap in URL_PATTERN.captures_iter(input) {
        // Group 1 is the bare-domain branch; the scheme'd branch has no group
        let (candidate, bare_domain) = match (cap.get(1), cap.get(0)) {
            (Some(domain), _) => (domain.as_str(), true),
            (None, Some(full)) => (full.as_str(), false),
            (None, None) => continue,
        };
        let cleaned = clean_url_trailing(candidate);
        trace!(url = %cleaned, "found URL candidate");

        match screen_url(cleaned, bare_domain) {
            Ok(()) => {
                if seen.insert(cleaned.to_string()) {
                    urls.push(cleaned.to_string());
                }
            }
            Err(reason) => {
                debug!(url = %cleaned, reason = %reason, "dropping URL candidate");
            }
        }
    }

    urls
}

/// Extracts arXiv identifiers from text input.
///
/// Finds `arxiv:`-prefixed identifiers and `arxiv.org/abs/` URLs, returning
/// the bare identifiers with surrounding punctuation trimmed.
///
/// # Examples
///
/// ```
/// use refcheck_core::extract::extract_arxiv_ids;
///
/// let ids = extract_arxiv_ids("arXiv:2101.00001 and http://arxiv.org/abs/876");
/// assert_eq!(ids, ["2101.00001", "876"]);
/// ```
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn extract_arxiv_ids(input: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for pattern in [&ARXIV_PREFIX_PATTERN, &ARXIV_ABS_PATTERN] {
        for cap in pattern.captures_iter(input) {
            let Some(raw) = cap.get(1) else { continue };
            // Line wraps leave stray dots, citation styles add parens
            let id = clean_url_trailing(raw.as_str()).trim_matches('.');
            if id.is_empty() {
                continue;
            }
            trace!(id = %id, "found arXiv candidate");
            if seen.insert(id.to_string()) {
                ids.push(id.to_string());
            }
        }
    }

    ids
}

/// Cleans trailing punctuation that often gets captured with URLs.
pub(crate) fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            // Usually sentence-ending punctuation, not part of the URL
            '.' | ',' | ';' | ':' | '!' | '?' => {
                if last == '.' {
                    // A 1-5 char alphanumeric tail after the last dot looks
                    // like a file extension; keep it
                    if let Some(dot_pos) = result.rfind('.') {
                        let after_dot = &result[dot_pos + 1..];
                        if (1..=5).contains(&after_dot.len())
                            && after_dot.chars().all(|c| c.is_ascii_alphanumeric())
                        {
                            break;
                        }
                    }
                }
                result = &result[..result.len() - 1];
            }
            // Closing brackets at the end are usually not part of the URL,
            // unless matched by an opener inside it (Wikipedia-style paths)
            ')' | ']' | '}' => {
                let open = match last {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

/// Light validity screen for URL candidates.
///
/// Scheme'd candidates must parse as URLs with a host. Bare-domain candidates
/// get a scheme prefixed before the same check, mirroring what the probe does
/// when it normalizes a target.
fn screen_url(candidate: &str, bare_domain: bool) -> Result<(), String> {
    if candidate.len() > MAX_URL_LENGTH {
        return Err(format!("exceeds {MAX_URL_LENGTH} bytes"));
    }

    let parsed = if bare_domain {
        Url::parse(&format!("http://{candidate}"))
    } else {
        Url::parse(candidate)
    };

    match parsed {
        Ok(url) if url.host().is_none() => Err("missing host".to_string()),
        Ok(_) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}
