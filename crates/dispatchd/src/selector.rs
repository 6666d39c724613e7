//! Skill selection for a query.
//!
//! Runs in a fixed order with no retries:
//! 1. Exempt candidates are selected outright with the sentinel score.
//! 2. One semantic lookup covers every remaining candidate.
//! 3. Each remaining candidate is scored from its descriptor and selected when
//!    the score reaches the threshold.
//!
//! A failed semantic lookup only empties that signal; scoring always runs.

use std::collections::{BTreeMap, BTreeSet};

use dispatch_core::exempt::is_exempt;
use dispatch_core::score::QueryMatcher;
use dispatch_core::skills::read_metadata;
use dispatch_core::{Candidate, Config, ScoreBreakdown, SelectionResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::recommend::SemanticRecommender;

/// Selection stage, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    Init,
    ExemptionPass,
    SemanticBatch,
    ScoringLoop,
    Done,
}

impl SelectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ExemptionPass => "exemption_pass",
            Self::SemanticBatch => "semantic_batch",
            Self::ScoringLoop => "scoring_loop",
            Self::Done => "done",
        }
    }
}

#[derive(Debug)]
pub struct Selector {
    exemptions: Vec<String>,
    recommender: SemanticRecommender,
}

impl Selector {
    pub fn new(exemptions: Vec<String>, recommender: SemanticRecommender) -> Self {
        Self {
            exemptions,
            recommender,
        }
    }

    pub fn from_config(config: &Config, recommender: SemanticRecommender) -> Self {
        Self::new(config.exemptions.clone(), recommender)
    }

    /// Select candidates relevant to `query`.
    pub async fn select(&self, query: &str, candidates: &[Candidate]) -> SelectionResult {
        let mut stage = SelectionStage::Init;
        debug!(stage = stage.as_str(), candidates = candidates.len(), "selecting skills");

        let mut selected = BTreeSet::new();
        let mut scores = BTreeMap::new();

        stage = SelectionStage::ExemptionPass;
        let (exempt, remaining): (Vec<&Candidate>, Vec<&Candidate>) = candidates
            .iter()
            .partition(|c| is_exempt(&c.name, &self.exemptions));
        for candidate in &exempt {
            selected.insert(candidate.name.clone());
            scores.insert(candidate.name.clone(), ScoreBreakdown::exempt());
        }
        debug!(stage = stage.as_str(), exempt = exempt.len(), "exemptions applied");

        stage = SelectionStage::SemanticBatch;
        let names: Vec<String> = remaining.iter().map(|c| c.name.clone()).collect();
        let recommendation = self.recommender.recommend(query, &names).await;
        debug!(
            stage = stage.as_str(),
            outcome = recommendation.as_str(),
            "semantic lookup finished"
        );
        let recommended = recommendation.names();

        stage = SelectionStage::ScoringLoop;
        let matcher = QueryMatcher::new(query);
        for candidate in remaining {
            let metadata = candidate
                .descriptor
                .as_ref()
                .map(read_metadata)
                .unwrap_or_default();
            let breakdown = matcher.score(&candidate.name, &metadata, &recommended);
            debug!(
                stage = stage.as_str(),
                name = %candidate.name,
                score = breakdown.score,
                reasons = ?breakdown.reasons,
                "scored skill"
            );
            if breakdown.passes_threshold() {
                selected.insert(candidate.name.clone());
            }
            scores.insert(candidate.name.clone(), breakdown);
        }

        stage = SelectionStage::Done;
        info!(
            stage = stage.as_str(),
            candidates = candidates.len(),
            selected = selected.len(),
            semantic = recommendation.as_str(),
            "skill selection complete"
        );

        SelectionResult {
            selected,
            scores,
            recommendation,
        }
    }
}
