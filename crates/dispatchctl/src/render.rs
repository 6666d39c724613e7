//! Output rendering for dispatchctl.
//!
//! Formats selections and transform results for terminal display.

use dispatch_core::{Recommendation, RewriteOutcome};

use crate::client::{SelectResponse, TransformResponse};

/// Print a score table for a manual selection.
pub fn print_selection(response: &SelectResponse) {
    let selection = &response.selection;
    if response.candidates.is_empty() {
        println!("No skills found.");
        return;
    }

    println!(
        "{:<28}  {:>5}  {:<8}  REASONS",
        "NAME", "SCORE", "SELECTED"
    );
    println!("{}", "-".repeat(90));

    for name in &response.candidates {
        let Some(breakdown) = selection.scores.get(name) else {
            continue;
        };
        let selected = if selection.selected.contains(name) {
            "yes"
        } else {
            "-"
        };
        let reasons = if breakdown.reasons.is_empty() {
            "-".to_string()
        } else {
            breakdown.reasons.join("; ")
        };
        println!(
            "{:<28}  {:>5}  {:<8}  {}",
            truncate(name, 28),
            breakdown.score,
            selected,
            reasons,
        );
    }

    println!();
    println!(
        "{} of {} skill(s) selected",
        selection.selected.len(),
        response.candidates.len()
    );
    println!("Semantic lookup: {}", format_recommendation(&selection.recommendation));
}

/// Print the kept records and what the transform did.
pub fn print_transform(response: &TransformResponse) {
    println!("Outcome: {}", format_outcome(&response.outcome));
    println!();
    println!("Records ({}):", response.records.len());
    for record in &response.records {
        let marker = if record.content().is_some() { "*" } else { " " };
        println!("  {marker} {}", record.path());
    }
}

fn format_outcome(outcome: &RewriteOutcome) -> String {
    match outcome {
        RewriteOutcome::NoQuery => "unchanged (no user query)".to_string(),
        RewriteOutcome::NoCandidates => "unchanged (no skill records)".to_string(),
        RewriteOutcome::Rewritten {
            selected,
            removed,
            report_appended,
        } => {
            let kept = if selected.is_empty() {
                "none".to_string()
            } else {
                selected.join(", ")
            };
            let report = if *report_appended { ", report appended" } else { "" };
            format!("rewritten (kept: {kept}; removed {removed} record(s){report})")
        }
        RewriteOutcome::Failed { reason } => format!("FAILED, records unchanged: {reason}"),
    }
}

fn format_recommendation(recommendation: &Recommendation) -> String {
    match recommendation {
        Recommendation::Recommended(names) if names.is_empty() => "nothing recommended".to_string(),
        Recommendation::Recommended(names) => names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Recommendation::Unavailable => "unavailable".to_string(),
        Recommendation::Failed(reason) => format!("failed ({reason})"),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn outcome_formatting() {
        assert_eq!(
            format_outcome(&RewriteOutcome::NoQuery),
            "unchanged (no user query)"
        );
        assert_eq!(
            format_outcome(&RewriteOutcome::Rewritten {
                selected: vec!["pdf".into(), "qmd".into()],
                removed: 4,
                report_appended: true,
            }),
            "rewritten (kept: pdf, qmd; removed 4 record(s), report appended)"
        );
        assert_eq!(
            format_outcome(&RewriteOutcome::Rewritten {
                selected: Vec::new(),
                removed: 1,
                report_appended: false,
            }),
            "rewritten (kept: none; removed 1 record(s))"
        );
    }

    #[test]
    fn recommendation_formatting() {
        let names: BTreeSet<String> = ["docx".to_string(), "pdf".to_string()].into();
        assert_eq!(
            format_recommendation(&Recommendation::Recommended(names)),
            "docx, pdf"
        );
        assert_eq!(
            format_recommendation(&Recommendation::Failed("timed out after 30000ms".into())),
            "failed (timed out after 30000ms)"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 28), "short");
        assert_eq!(truncate("ééééééééé", 6), "ééé...");
    }
}
