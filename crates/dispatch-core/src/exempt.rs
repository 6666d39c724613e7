//! Exemption patterns: candidates that are always kept.
//!
//! A pattern is either an exact skill name or a prefix ending in `*`.

/// Patterns used when configuration does not provide any.
pub const DEFAULT_EXEMPTIONS: [&str; 2] = ["zesty-*", "qmd"];

/// Wildcard marker recognised at the end of a pattern.
const WILDCARD: char = '*';

/// Returns true if `name` matches any pattern.
pub fn is_exempt<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| pattern_matches(p.as_ref(), name))
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix(WILDCARD) {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}
