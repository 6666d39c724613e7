//! Core types shared by the daemon and the CLI.
//!
//! Everything here is request-scoped: built fresh for one transform call and
//! dropped once the manifest has been rewritten.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A file-like entry owned by the host.
///
/// Hosts send either a bare path string or an object with a `path`. Objects
/// are kept as raw JSON so they serialize back byte-for-byte in field order,
/// with explicit nulls and fields this crate does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Path(String),
    Entry(Map<String, Value>),
}

impl Record {
    /// Create an object record with inline content.
    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        let mut entry = Map::new();
        entry.insert("path".to_string(), Value::String(path.into()));
        entry.insert("content".to_string(), Value::String(content.into()));
        Self::Entry(entry)
    }

    /// The record's path, or `""` for an object without a string `path`.
    pub fn path(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Entry(entry) => entry.get("path").and_then(Value::as_str).unwrap_or(""),
        }
    }

    /// Inline text content. Non-string content (null, buffers, objects) reads as absent.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Entry(entry) => entry.get("content").and_then(Value::as_str),
        }
    }
}

/// One prior conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TurnContent>,
}

/// Turn content: plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single content part. Only `text` is read; other fields are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TurnContent {
    /// Flatten to text. Parts are joined with newlines; non-text parts are skipped.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Inbound hook event: the conversation so far plus the record list to rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformEvent {
    #[serde(default)]
    pub messages: Vec<Turn>,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl TransformEvent {
    /// The query: content of the most recent `user` turn.
    ///
    /// Returns `None` when there is no user turn or its content is blank.
    /// Earlier user turns are never consulted.
    pub fn query(&self) -> Option<String> {
        let turn = self.messages.iter().rev().find(|t| t.role == "user")?;
        let text = turn.content.as_ref()?.text();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Where a candidate's `SKILL.md` header is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Read a bounded prefix from disk.
    File(PathBuf),
    /// The host supplied the descriptor content with the record.
    Inline(String),
}

/// A skill competing for a place in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub descriptor: Option<Descriptor>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, descriptor: Option<Descriptor>) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// Score and the reasons that add up to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: u32,
    pub reasons: Vec<String>,
}

/// Outcome of the batched semantic lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Recommendation {
    /// The collaborator answered; names are already filtered to known candidates.
    Recommended(BTreeSet<String>),
    /// No collaborator is configured, or there was nothing to ask about.
    Unavailable,
    /// The call or its reply failed. The signal counts as empty.
    Failed(String),
}

impl Recommendation {
    /// Collapse to the set of recommended names (empty unless `Recommended`).
    pub fn names(&self) -> BTreeSet<String> {
        match self {
            Self::Recommended(names) => names.clone(),
            Self::Unavailable | Self::Failed(_) => BTreeSet::new(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recommended(_) => "recommended",
            Self::Unavailable => "unavailable",
            Self::Failed(_) => "failed",
        }
    }
}

/// Result of one selection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selected: BTreeSet<String>,
    pub scores: BTreeMap<String, ScoreBreakdown>,
    pub recommendation: Recommendation,
}

/// What a transform call did to the record list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewriteOutcome {
    /// No usable user turn; records untouched.
    NoQuery,
    /// No record belongs to a skill; records untouched.
    NoCandidates,
    Rewritten {
        selected: Vec<String>,
        removed: usize,
        report_appended: bool,
    },
    /// Selection aborted; records untouched.
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> Turn {
        Turn {
            role: "user".to_string(),
            content: Some(TurnContent::Text(text.to_string())),
        }
    }

    fn assistant(text: &str) -> Turn {
        Turn {
            role: "assistant".to_string(),
            content: Some(TurnContent::Text(text.to_string())),
        }
    }

    #[test]
    fn record_accepts_bare_path_and_object() {
        let records: Vec<Record> = serde_json::from_str(
            r#"["skills/pdf/SKILL.md", {"path": "README.md", "content": "hi"}]"#,
        )
        .unwrap();
        assert_eq!(records[0], Record::Path("skills/pdf/SKILL.md".to_string()));
        assert_eq!(records[1].path(), "README.md");
        assert_eq!(records[1].content(), Some("hi"));
    }

    #[test]
    fn record_keeps_shape_and_unknown_fields() {
        let input = r#"["a.md",{"path":"b.md","mime":"text/markdown"}]"#;
        let records: Vec<Record> = serde_json::from_str(input).unwrap();
        assert_eq!(records[1].content(), None);
        let output = serde_json::to_string(&records).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn record_preserves_nulls_and_key_order() {
        let input = r#"[{"path":"a.md","content":null},{"mtime":2,"path":"skills/pdf/SKILL.md","kind":"file"}]"#;
        let records: Vec<Record> = serde_json::from_str(input).unwrap();
        assert_eq!(records[0].content(), None);
        assert_eq!(records[1].path(), "skills/pdf/SKILL.md");
        assert_eq!(serde_json::to_string(&records).unwrap(), input);
    }

    #[test]
    fn non_string_content_reads_as_absent() {
        let input = r#"[{"path":"skills/pdf/SKILL.md","content":{"type":"buffer","data":[1,2]}},{"path":"b.md","content":7}]"#;
        let records: Vec<Record> = serde_json::from_str(input).unwrap();
        assert_eq!(records[0].content(), None);
        assert_eq!(records[1].content(), None);
        assert_eq!(serde_json::to_string(&records).unwrap(), input);
    }

    #[test]
    fn file_record_serializes_path_first() {
        let record = Record::file("report.md", "# Report");
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r##"{"path":"report.md","content":"# Report"}"##
        );
    }

    #[test]
    fn query_uses_most_recent_user_turn() {
        let event = TransformEvent {
            messages: vec![user("first"), assistant("reply"), user("second")],
            records: Vec::new(),
        };
        assert_eq!(event.query().as_deref(), Some("second"));
    }

    #[test]
    fn query_is_none_without_user_turn() {
        let event = TransformEvent {
            messages: vec![assistant("hello")],
            records: Vec::new(),
        };
        assert!(event.query().is_none());
    }

    #[test]
    fn query_blank_latest_user_turn_does_not_fall_back() {
        let event = TransformEvent {
            messages: vec![user("older question"), user("   ")],
            records: Vec::new(),
        };
        assert!(event.query().is_none());
    }

    #[test]
    fn query_joins_text_parts() {
        let event: TransformEvent = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":[{"type":"text","text":"convert"},{"type":"image","url":"x"},{"type":"text","text":"the pdf"}]}]}"#,
        )
        .unwrap();
        assert_eq!(event.query().as_deref(), Some("convert\nthe pdf"));
    }

    #[test]
    fn recommendation_collapses_to_names() {
        let names: BTreeSet<String> = ["pdf".to_string()].into_iter().collect();
        assert_eq!(Recommendation::Recommended(names.clone()).names(), names);
        assert!(Recommendation::Unavailable.names().is_empty());
        assert!(Recommendation::Failed("boom".into()).names().is_empty());
    }

    #[test]
    fn rewrite_outcome_serializes_with_kind() {
        let json = serde_json::to_value(RewriteOutcome::NoQuery).unwrap();
        assert_eq!(json["kind"], "no_query");
        let json = serde_json::to_value(RewriteOutcome::Failed {
            reason: "x".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "failed");
        assert_eq!(json["reason"], "x");
    }
}
