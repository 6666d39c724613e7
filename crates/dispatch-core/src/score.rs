//! Per-candidate relevance scoring.
//!
//! Three independent signals add up to one score:
//! - name appears in the query as a whole word: +60
//! - name was recommended by the semantic lookup: +60
//! - query keywords found in the description: +10 each, capped at 30
//!
//! A candidate is kept when its score reaches [`SELECTION_THRESHOLD`]. Either
//! strong signal alone reaches it; description keywords alone never do.

use crate::skills::SkillMetadata;
use crate::types::ScoreBreakdown;
use regex::Regex;
use std::collections::BTreeSet;

pub const NAME_MATCH_POINTS: u32 = 60;
pub const SEMANTIC_POINTS: u32 = 60;
pub const KEYWORD_POINTS: u32 = 10;
pub const DESCRIPTION_CAP: u32 = 30;

/// Minimum score for a non-exempt candidate to be selected.
pub const SELECTION_THRESHOLD: u32 = 60;

/// Sentinel score given to exempt candidates.
pub const EXEMPT_SCORE: u32 = 999;
pub const EXEMPT_REASON: &str = "Exemption";

/// Query tokens of this many characters or fewer are ignored.
const MIN_KEYWORD_CHARS: usize = 2;

impl ScoreBreakdown {
    /// Breakdown for a candidate kept by an exemption pattern.
    pub fn exempt() -> Self {
        Self {
            score: EXEMPT_SCORE,
            reasons: vec![EXEMPT_REASON.to_string()],
        }
    }

    pub fn passes_threshold(&self) -> bool {
        passes_threshold(self.score)
    }
}

pub fn passes_threshold(score: u32) -> bool {
    score >= SELECTION_THRESHOLD
}

/// A query prepared for scoring many candidates.
///
/// Keyword patterns are compiled once here and reused for every description.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    query: String,
    keywords: Vec<(String, Regex)>,
}

impl QueryMatcher {
    pub fn new(query: &str) -> Self {
        let query = query.to_lowercase();
        let keywords = query
            .split_whitespace()
            .filter(|token| token.chars().count() > MIN_KEYWORD_CHARS)
            .filter_map(|token| word_pattern(token).map(|re| (token.to_string(), re)))
            .collect();
        Self { query, keywords }
    }

    /// Whether `name` appears in the query as a whole word.
    pub fn matches_name(&self, name: &str) -> bool {
        word_pattern(name).is_some_and(|re| re.is_match(&self.query))
    }

    /// Query tokens found as whole words in the description, in query order.
    ///
    /// Tokens are split on whitespace only and are not deduplicated.
    pub fn description_keywords(&self, description: &str) -> Vec<&str> {
        if description.is_empty() {
            return Vec::new();
        }
        self.keywords
            .iter()
            .filter(|(_, re)| re.is_match(description))
            .map(|(token, _)| token.as_str())
            .collect()
    }

    /// Score one non-exempt candidate.
    pub fn score(
        &self,
        name: &str,
        metadata: &SkillMetadata,
        recommended: &BTreeSet<String>,
    ) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::default();

        if self.matches_name(name) {
            breakdown.score += NAME_MATCH_POINTS;
            breakdown
                .reasons
                .push(format!("Name match (+{NAME_MATCH_POINTS})"));
        }

        if recommended.contains(name) {
            breakdown.score += SEMANTIC_POINTS;
            breakdown
                .reasons
                .push(format!("Semantic recommendation (+{SEMANTIC_POINTS})"));
        }

        let matched = self.description_keywords(&metadata.description);
        if !matched.is_empty() {
            let count = u32::try_from(matched.len()).unwrap_or(u32::MAX);
            let points = count.saturating_mul(KEYWORD_POINTS).min(DESCRIPTION_CAP);
            breakdown.score += points;
            breakdown.reasons.push(format!(
                "Description keywords: {} (+{points})",
                matched.join(", ")
            ));
        }

        breakdown
    }
}

/// Score one candidate against a query prepared on the spot.
pub fn score_candidate(
    name: &str,
    query: &str,
    metadata: &SkillMetadata,
    recommended: &BTreeSet<String>,
) -> ScoreBreakdown {
    QueryMatcher::new(query).score(name, metadata, recommended)
}

/// Case-insensitive whole-word search for a literal `word` in `text`.
pub fn contains_word(text: &str, word: &str) -> bool {
    word_pattern(word).is_some_and(|re| re.is_match(text))
}

fn word_pattern(word: &str) -> Option<Regex> {
    if word.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).ok()
}
