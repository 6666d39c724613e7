//! Skill catalog: directory scanning for the manual selection path.
//!
//! Each subdirectory of a skills directory that contains a `SKILL.md` is a
//! candidate named after the subdirectory. Directories are scanned in order
//! and the first occurrence of a name wins.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use dispatch_core::skills::DESCRIPTOR_FILE;
use dispatch_core::{Candidate, Descriptor};
use tracing::{debug, warn};

/// Discover candidates in `dirs`, in priority order.
pub fn discover_candidates(dirs: &[PathBuf]) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for dir in dirs {
        scan_directory(dir, &mut candidates, &mut seen_names);
    }

    debug!(count = candidates.len(), "discovered skills");
    candidates
}

/// Scan a single directory for skills.
fn scan_directory(dir: &Path, candidates: &mut Vec<Candidate>, seen_names: &mut HashSet<String>) {
    if !dir.is_dir() {
        debug!(path = %dir.display(), "skills directory not found, skipping");
        return;
    }

    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).map(|e| e.path()).collect(),
        Err(e) => {
            warn!(
                path = %dir.display(),
                error = %e,
                "failed to read skills directory"
            );
            return;
        }
    };
    // read_dir order is platform dependent.
    entries.sort();

    for skill_dir in entries {
        if !skill_dir.is_dir() {
            continue;
        }

        let descriptor = skill_dir.join(DESCRIPTOR_FILE);
        if !descriptor.is_file() {
            debug!(path = %skill_dir.display(), "no SKILL.md found, skipping");
            continue;
        }

        let Some(name) = skill_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if !seen_names.insert(name.to_string()) {
            debug!(name, path = %skill_dir.display(), "duplicate skill name, skipping");
            continue;
        }

        candidates.push(Candidate::new(name, Some(Descriptor::File(descriptor))));
    }
}
