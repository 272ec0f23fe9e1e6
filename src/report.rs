//! Merged verification report.
//!
//! A [`Report`] is the single value the verifier hands to the CLI and
//! output layers: link results, retraction verdicts, and their summaries.
//! Serialization nests each engine's data under `"link_check"` and
//! `"retraction_check"` keys, with `"results"` and `"summary"` sub-objects,
//! so consumers can address either check independently.

use std::collections::HashMap;

use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::retraction::{RetractionSummary, RetractionVerdict};
use crate::verify::{CheckResult, LinkSummary};

/// Combined outcome of one verification run.
#[derive(Debug, Clone)]
pub struct Report {
    /// Per-target link check results.
    pub link_results: Vec<CheckResult>,
    /// Aggregate link counts.
    pub link_summary: LinkSummary,
    /// Per-DOI retraction verdicts.
    pub retraction_results: HashMap<String, RetractionVerdict>,
    /// Aggregate retraction counts.
    pub retraction_summary: RetractionSummary,
}

impl Report {
    /// Creates a report with no results, summaries zeroed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            link_results: Vec::new(),
            link_summary: LinkSummary::from_results(&[]),
            retraction_results: HashMap::new(),
            retraction_summary: RetractionSummary::from_verdicts(&HashMap::new()),
        }
    }

    /// Whether any checked item came back broken, retracted, or uncheckable.
    #[must_use]
    pub fn has_problems(&self) -> bool {
        self.link_summary.unreachable_count > 0
            || self.link_summary.error_count > 0
            || self.retraction_summary.retracted_count > 0
            || self.retraction_summary.error_count > 0
    }

    /// Total number of items that were checked.
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.link_summary.total + self.retraction_summary.total
    }
}

impl Serialize for Report {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct Section<'a, R: Serialize, U: Serialize> {
            results: &'a R,
            summary: &'a U,
        }

        let mut state = serializer.serialize_struct("Report", 2)?;
        state.serialize_field(
            "link_check",
            &Section {
                results: &self.link_results,
                summary: &self.link_summary,
            },
        )?;
        state.serialize_field(
            "retraction_check",
            &Section {
                results: &self.retraction_results,
                summary: &self.retraction_summary,
            },
        )?;
        state.end()
    }
}
