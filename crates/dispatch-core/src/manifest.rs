//! Manifest grouping and rebuilding.
//!
//! Records under `.../skills/<name>/...` belong to skill `<name>`; everything
//! else passes through verbatim. Rebuilding is pure: it consumes the grouped
//! records and returns the new list, leaving the swap into the host's list to
//! the caller.

use crate::skills::is_descriptor_path;
use crate::types::{Candidate, Descriptor, Record};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Path segment that precedes a skill name.
pub const SKILLS_SEGMENT: &str = "skills";

/// Skill name for a record path, if the path lies inside a skill directory.
///
/// The name is the segment right after the first `skills` segment that is
/// followed by at least one more segment.
pub fn skill_name_for_path(path: &str) -> Option<&str> {
    let segments: Vec<&str> = path.split(['/', '\\']).collect();
    segments
        .windows(3)
        .find(|w| w[0] == SKILLS_SEGMENT && !w[1].is_empty())
        .map(|w| w[1])
}

/// All records of one skill, in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillGroup {
    pub name: String,
    pub records: Vec<Record>,
}

impl SkillGroup {
    /// Where to read this skill's header from.
    ///
    /// Uses the `SKILL.md` record; non-empty inline content is preferred over
    /// the path.
    pub fn descriptor(&self) -> Option<Descriptor> {
        let record = self.records.iter().find(|r| is_descriptor_path(r.path()))?;
        Some(match record.content().filter(|content| !content.is_empty()) {
            Some(content) => Descriptor::Inline(content.to_string()),
            None => Descriptor::File(PathBuf::from(record.path())),
        })
    }
}

/// Records split into pass-through records and per-skill groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestGroups {
    /// Records that do not belong to a skill, in original order.
    pub other: Vec<Record>,
    /// Skill groups in order of first appearance.
    pub skills: Vec<SkillGroup>,
}

impl ManifestGroups {
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut groups = Self::default();
        for record in records {
            let Some(name) = skill_name_for_path(record.path()).map(str::to_string) else {
                groups.other.push(record);
                continue;
            };
            match groups.skills.iter_mut().find(|g| g.name == name) {
                Some(group) => group.records.push(record),
                None => groups.skills.push(SkillGroup {
                    name,
                    records: vec![record],
                }),
            }
        }
        groups
    }

    /// One candidate per distinct skill name.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.skills
            .iter()
            .map(|g| Candidate::new(g.name.clone(), g.descriptor()))
            .collect()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.other.len() + self.skills.iter().map(|g| g.records.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-skill records, then the records of each selected skill.
    pub fn rebuild(self, selected: &BTreeSet<String>) -> Vec<Record> {
        let mut records = self.other;
        for group in self.skills {
            if selected.contains(&group.name) {
                records.extend(group.records);
            }
        }
        records
    }
}
