//! Prompt assembly and reply parsing for the semantic recommendation call.
//!
//! One prompt covers every non-exempt candidate so the collaborator is asked
//! exactly once per selection run.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Sampling temperature requested for the recommendation call.
pub const RECOMMENDATION_TEMPERATURE: f32 = 0.1;

/// From the first `[` to the last `]`, across lines.
static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("reply is empty")]
    Empty,
    #[error("no JSON array in reply")]
    NoArray,
    #[error("invalid JSON array: {0}")]
    InvalidJson(String),
}

/// Build the recommendation instruction for `query` over `names`.
pub fn build_recommendation_prompt(query: &str, names: &[String]) -> String {
    let list = serde_json::to_string(names).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You route a user request to the skills that can help with it.\n\n\
         User request:\n\"\"\"\n{query}\n\"\"\"\n\n\
         Available skills:\n{list}\n\n\
         Return a JSON array with the names of the skills that are relevant to the request, \
         for example [\"skill-a\", \"skill-b\"]. Return [] if none apply. \
         Output only the JSON array and nothing else."
    )
}

/// Extract the names from a collaborator reply.
///
/// Non-string array entries are ignored.
pub fn parse_reply(reply: &str) -> Result<Vec<String>, ReplyError> {
    if reply.trim().is_empty() {
        return Err(ReplyError::Empty);
    }
    let array = JSON_ARRAY.find(reply).ok_or(ReplyError::NoArray)?;
    let values: Vec<serde_json::Value> = serde_json::from_str(array.as_str())
        .map_err(|e| ReplyError::InvalidJson(e.to_string()))?;
    Ok(values
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

/// Split parsed names into known candidates and names that are not candidates.
pub fn retain_known(names: Vec<String>, candidates: &[String]) -> (BTreeSet<String>, Vec<String>) {
    let mut known = BTreeSet::new();
    let mut unknown = Vec::new();
    for name in names {
        if candidates.contains(&name) {
            known.insert(name);
        } else {
            unknown.push(name);
        }
    }
    (known, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn prompt_embeds_query_and_candidate_list() {
        let prompt = build_recommendation_prompt("fill in the tax form", &names(&["pdf", "docx"]));
        assert!(prompt.contains("fill in the tax form"));
        assert!(prompt.contains(r#"["pdf","docx"]"#));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn parse_plain_array() {
        assert_eq!(parse_reply(r#"["pdf", "docx"]"#).unwrap(), names(&["pdf", "docx"]));
    }

    #[test]
    fn parse_array_wrapped_in_prose_and_fences() {
        let reply = "Sure! Here you go:\n```json\n[\n  \"pdf\"\n]\n```\n";
        assert_eq!(parse_reply(reply).unwrap(), names(&["pdf"]));
    }

    #[test]
    fn parse_empty_array() {
        assert!(parse_reply("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_skips_non_string_entries() {
        assert_eq!(parse_reply(r#"["pdf", 3, null]"#).unwrap(), names(&["pdf"]));
    }

    #[test]
    fn parse_without_array_fails() {
        assert_eq!(parse_reply("none of them"), Err(ReplyError::NoArray));
        assert_eq!(parse_reply("  "), Err(ReplyError::Empty));
    }

    #[test]
    fn parse_invalid_json_fails() {
        assert!(matches!(
            parse_reply("[pdf, docx]"),
            Err(ReplyError::InvalidJson(_))
        ));
    }

    #[test]
    fn retain_known_drops_hallucinated_names() {
        let (known, unknown) =
            retain_known(names(&["pdf", "made-up", "pdf"]), &names(&["pdf", "docx"]));
        assert_eq!(known.into_iter().collect::<Vec<_>>(), names(&["pdf"]));
        assert_eq!(unknown, names(&["made-up"]));
    }
}
