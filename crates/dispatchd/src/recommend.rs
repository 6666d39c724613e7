//! Batched semantic recommendation.
//!
//! Asks the text-generation collaborator once for all candidates and turns
//! whatever comes back into a [`Recommendation`]. Nothing in here fails the
//! selection: a missing collaborator, an error, a timeout or an unusable
//! reply each become a non-`Recommended` outcome that scores as empty.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dispatch_core::prompt::{
    build_recommendation_prompt, parse_reply, retain_known, RECOMMENDATION_TEMPERATURE,
};
use dispatch_core::{Config, Recommendation};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::generator::{ChatMessage, GenerateRequest, TextGenerator};

pub struct SemanticRecommender {
    generator: Option<Arc<dyn TextGenerator>>,
    model: String,
    /// `None` waits for as long as the collaborator takes.
    timeout: Option<Duration>,
}

impl fmt::Debug for SemanticRecommender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticRecommender")
            .field("generator", &self.generator.is_some())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SemanticRecommender {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            generator,
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        let timeout = (config.semantic_timeout_sec > 0)
            .then(|| Duration::from_secs(u64::from(config.semantic_timeout_sec)));
        Self::new(generator, config.router_model.clone(), timeout)
    }

    /// Recommend a subset of `names` for `query`. Makes at most one call.
    pub async fn recommend(&self, query: &str, names: &[String]) -> Recommendation {
        let Some(generator) = &self.generator else {
            debug!("no text generator configured, skipping semantic lookup");
            return Recommendation::Unavailable;
        };
        if names.is_empty() {
            return Recommendation::Unavailable;
        }

        let request = GenerateRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(build_recommendation_prompt(query, names))],
            temperature: RECOMMENDATION_TEMPERATURE,
        };

        let call = generator.generate_text(request);
        let result = match self.timeout {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?limit, "semantic lookup timed out");
                    return Recommendation::Failed(format!(
                        "timed out after {}ms",
                        limit.as_millis()
                    ));
                }
            },
            None => call.await,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "semantic lookup failed");
                return Recommendation::Failed(e.to_string());
            }
        };

        let parsed = match parse_reply(response.body().unwrap_or_default()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "unusable semantic lookup reply");
                return Recommendation::Failed(e.to_string());
            }
        };

        let (known, unknown) = retain_known(parsed, names);
        if !unknown.is_empty() {
            debug!(names = ?unknown, "dropping recommended names that are not candidates");
        }
        debug!(recommended = ?known, "semantic lookup complete");
        Recommendation::Recommended(known)
    }
}
