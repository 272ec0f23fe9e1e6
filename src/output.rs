//! Text and JSON rendering of verification reports.
//!
//! Both renderers are pure functions over a finished [`Report`], so the CLI
//! can print to the terminal, write to a file, or do both without re-running
//! any checks. The text form is a human-readable summary; the JSON form is
//! the full report in the `link_check`/`retraction_check` shape for
//! downstream tooling.
//!
//! # Example
//!
//! ```
//! use refcheck_core::output::render_text;
//! use refcheck_core::Report;
//!
//! let report = Report::empty();
//! assert_eq!(render_text(&report, &[]), "No references checked.\n");
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::reference::Reference;
use crate::report::Report;
use crate::retraction::RetractionVerdict;
use crate::verify::CheckResult;

/// Renders a report as a human-readable text summary.
///
/// # Arguments
///
/// * `report` - The finished verification report
/// * `refs` - The reference batch the report was produced from, used to
///   annotate broken links with the page they were extracted from
///
/// # Behavior
///
/// Each engine that checked at least one item gets its own section; a report
/// with nothing checked renders as a single `No references checked.` line.
/// Broken links are grouped by failure reason (HTTP status or transport
/// error), groups sorted by reason, and retracted DOIs are listed with
/// title, journal, and notice URL when known.
#[must_use]
pub fn render_text(report: &Report, refs: &[Reference]) -> String {
    let mut out = String::new();

    if report.link_summary.total > 0 {
        render_link_section(&mut out, report, refs);
    }
    if report.retraction_summary.total > 0 {
        if !out.is_empty() {
            out.push('\n');
        }
        render_retraction_section(&mut out, report);
    }
    if out.is_empty() {
        out.push_str("No references checked.\n");
    }
    out
}

/// Renders a report as pretty-printed JSON.
///
/// The output nests each engine's data under `"link_check"` and
/// `"retraction_check"` keys, each with `"results"` and `"summary"`
/// sub-objects.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] when serialization fails.
pub fn render_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn render_link_section(out: &mut String, report: &Report, refs: &[Reference]) {
    let pages = page_index(refs);

    out.push_str("Link check:\n");
    out.push_str(&format!("{} working\n", report.link_summary.reachable_count));

    let mut broken: BTreeMap<String, Vec<&CheckResult>> = BTreeMap::new();
    for result in &report.link_results {
        if !result.reachable {
            broken
                .entry(failure_reason(result))
                .or_default()
                .push(result);
        }
    }

    for (reason, results) in &broken {
        out.push_str(&format!("{} broken (reason: {reason})\n", results.len()));
        for result in results {
            match pages.get(result.identifier.as_str()) {
                Some(page) => {
                    out.push_str(&format!("  - {} (page {page})\n", result.identifier));
                }
                None => out.push_str(&format!("  - {}\n", result.identifier)),
            }
        }
    }
}

fn render_retraction_section(out: &mut String, report: &Report) {
    let summary = &report.retraction_summary;

    out.push_str("Retraction check:\n");
    out.push_str(&format!("- Total DOIs checked: {}\n", summary.total));
    out.push_str(&format!("- Clean papers: {}\n", summary.clean_count));
    out.push_str(&format!("- Retracted papers: {}\n", summary.retracted_count));
    out.push_str(&format!("- Errors: {}\n", summary.error_count));

    if summary.retracted_count > 0 {
        out.push_str("\n⚠️  Retracted papers found:\n");
        for doi in &summary.retracted_dois {
            let Some(verdict) = report.retraction_results.get(doi) else {
                continue;
            };
            out.push_str(&retracted_line(verdict));
        }
    }

    if summary.error_count > 0 {
        out.push_str("\n⚠️  Errors encountered:\n");
        for doi in &summary.error_dois {
            let reason = report
                .retraction_results
                .get(doi)
                .and_then(|verdict| verdict.error)
                .map_or_else(|| "unknown".to_string(), |kind| kind.to_string());
            out.push_str(&format!("  - {doi}: {reason}\n"));
        }
    }
}

/// One list line for a retracted DOI, with whatever metadata the sources
/// exposed.
fn retracted_line(verdict: &RetractionVerdict) -> String {
    let mut line = format!("  - {}", verdict.doi);
    if let Some(title) = &verdict.title {
        line.push_str(&format!(" \"{title}\""));
    }
    if let Some(journal) = &verdict.journal {
        line.push_str(&format!(" ({journal})"));
    }
    if let Some(notice) = &verdict.notice_url {
        line.push_str(&format!(" notice: {notice}"));
    }
    line.push('\n');
    line
}

/// The group label for a failed check: the HTTP status when one was
/// received, the transport error otherwise.
fn failure_reason(result: &CheckResult) -> String {
    match (result.status_code, result.error) {
        (Some(status), _) => status.to_string(),
        (None, Some(kind)) => kind.to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Maps each link target to the first page it was seen on, for annotating
/// result lines. Targets whose references never carried a page are absent.
fn page_index(refs: &[Reference]) -> HashMap<String, u32> {
    let mut pages = HashMap::new();
    for reference in refs {
        let (Some(target), Some(page)) = (reference.link_target(), reference.page) else {
            continue;
        };
        pages.entry(target).or_insert(page);
    }
    pages
}
