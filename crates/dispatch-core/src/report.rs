//! Diagnostic report appended to a rewritten manifest.
//!
//! The report lists the selected skills with their scores and reasons, the
//! threshold that was applied, and how the semantic lookup went.

use crate::score::SELECTION_THRESHOLD;
use crate::types::{Record, Recommendation, SelectionResult};

/// Path of the synthetic report record.
pub const REPORT_PATH: &str = "zesty-dispatcher-report.md";

/// A single row in the report table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub name: String,
    pub score: u32,
    pub reasons: Vec<String>,
}

impl ReportRow {
    fn to_table_line(&self) -> String {
        let reasons = if self.reasons.is_empty() {
            "-".to_string()
        } else {
            sanitize_cell(&self.reasons.join("; "))
        };
        format!("| {} | {} | {} |", sanitize_cell(&self.name), self.score, reasons)
    }
}

/// Keep a value on one table line.
fn sanitize_cell(value: &str) -> String {
    value.replace(['\n', '\r'], " ").replace('|', "\\|")
}

/// Report over the selected skills of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionReport {
    pub threshold: u32,
    pub rows: Vec<ReportRow>,
    pub recommendation: String,
}

impl SelectionReport {
    pub fn from_selection(selection: &SelectionResult) -> Self {
        let rows = selection
            .selected
            .iter()
            .map(|name| {
                let breakdown = selection.scores.get(name).cloned().unwrap_or_default();
                ReportRow {
                    name: name.clone(),
                    score: breakdown.score,
                    reasons: breakdown.reasons,
                }
            })
            .collect();

        let recommendation = match &selection.recommendation {
            Recommendation::Recommended(names) => format!("recommended {} skill(s)", names.len()),
            Recommendation::Unavailable => "unavailable".to_string(),
            Recommendation::Failed(reason) => format!("failed ({})", sanitize_cell(reason)),
        };

        Self {
            threshold: SELECTION_THRESHOLD,
            rows,
            recommendation,
        }
    }

    /// Render as markdown.
    pub fn to_markdown(&self) -> String {
        let names: Vec<&str> = self.rows.iter().map(|r| r.name.as_str()).collect();
        let mut out = String::from("# Zesty Dispatcher\n\n");
        out.push_str(&format!("Selected skills: {}\n", names.join(", ")));
        out.push_str(&format!("Threshold: {}\n", self.threshold));
        out.push_str(&format!("Semantic lookup: {}\n\n", self.recommendation));
        out.push_str("| Skill | Score | Reasons |\n|-------|-------|---------|\n");
        for row in &self.rows {
            out.push_str(&row.to_table_line());
            out.push('\n');
        }
        out
    }
}

/// Report record for a selection, or `None` if nothing was selected.
pub fn report_record(selection: &SelectionResult) -> Option<Record> {
    if selection.selected.is_empty() {
        return None;
    }
    let report = SelectionReport::from_selection(selection);
    Some(Record::file(REPORT_PATH, report.to_markdown()))
}
