//! Skill descriptor metadata.
//!
//! Reads the `name` and `description` keys from the `---` delimited header of
//! a `SKILL.md`. Only a bounded prefix of the descriptor is inspected, and
//! every failure collapses to empty metadata so scoring can carry on.

use crate::types::Descriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::LazyLock;

/// File name of the distinguished descriptor record of a skill.
pub const DESCRIPTOR_FILE: &str = "SKILL.md";

/// Maximum number of bytes read from a descriptor.
pub const DESCRIPTOR_PREFIX_BYTES: usize = 1024;

/// First `---` line, body, closing `---` line. Not anchored to content start.
static HEADER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^---[ \t]*\r?\n(.*?)\r?\n---[ \t]*\r?$").expect("header pattern compiles")
});

/// Metadata declared in a descriptor header. Missing keys are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
}

/// Returns true if `path` names a descriptor file.
pub fn is_descriptor_path(path: &str) -> bool {
    path.rsplit(['/', '\\'])
        .next()
        .is_some_and(|file| file == DESCRIPTOR_FILE)
}

/// Read metadata from a descriptor, never failing.
pub fn read_metadata(descriptor: &Descriptor) -> SkillMetadata {
    match read_prefix(descriptor) {
        Ok(prefix) => parse_header(&prefix),
        Err(_) => SkillMetadata::default(),
    }
}

/// Read at most [`DESCRIPTOR_PREFIX_BYTES`] of the descriptor.
pub fn read_prefix(descriptor: &Descriptor) -> io::Result<String> {
    match descriptor {
        Descriptor::File(path) => read_file_prefix(path),
        Descriptor::Inline(content) => Ok(truncate_at_boundary(content, DESCRIPTOR_PREFIX_BYTES).to_string()),
    }
}

fn read_file_prefix(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut buf = Vec::with_capacity(DESCRIPTOR_PREFIX_BYTES);
    file.take(DESCRIPTOR_PREFIX_BYTES as u64).read_to_end(&mut buf)?;
    // The cut may land inside a multi-byte character.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Longest prefix of `text` that is at most `max_bytes` and ends on a char boundary.
fn truncate_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Parse the first header block in `content`.
///
/// Lines are split at the first colon; keys are matched case-insensitively and
/// the last occurrence of a key wins. Lines without a colon are ignored.
pub fn parse_header(content: &str) -> SkillMetadata {
    let mut meta = SkillMetadata::default();
    let Some(body) = HEADER_BLOCK.captures(content).and_then(|c| c.get(1)) else {
        return meta;
    };

    for line in body.as_str().lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = unquote(value.trim());
        match key.trim().to_lowercase().as_str() {
            "name" => meta.name = value.to_string(),
            "description" => meta.description = value.to_string(),
            _ => {}
        }
    }
    meta
}

/// Strip one layer of matching single or double quotes.
pub(crate) fn unquote(value: &str) -> &str {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        return &value[1..value.len() - 1];
    }
    value
}
