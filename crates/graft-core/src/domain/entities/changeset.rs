//! The merged result of a run: per-file changes plus everything that could
//! not be merged.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::common::RelativePath;
use super::patch::{PatchOperation, Provenance};
use crate::domain::syntax::NodePath;
use crate::domain::value_objects::{ConfigValue, KeyPath};

/// Who put the current content there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Owner {
    /// Present before the run.
    Project,
    Generator { provenance: Provenance },
}

impl From<Provenance> for Owner {
    fn from(provenance: Provenance) -> Self {
        Self::Generator { provenance }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => f.write_str("the existing project"),
            Self::Generator { provenance } => fmt::Display::fmt(provenance, f),
        }
    }
}

/// Several parties claim one path with different contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlreadyExistsConflict {
    pub path: RelativePath,
    pub claimants: Vec<Owner>,
}

/// A configuration key already holds a different value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueConflict {
    pub path: RelativePath,
    pub key_path: KeyPath,
    pub existing: ConfigValue,
    pub existing_owner: Owner,
    pub incoming: ConfigValue,
    pub incoming_owner: Provenance,
}

/// Two raw edits touch overlapping regions of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawEditConflict {
    pub path: RelativePath,
    pub first: Provenance,
    pub first_target: NodePath,
    pub second: Provenance,
    pub second_target: NodePath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "conflict", rename_all = "kebab-case")]
pub enum Conflict {
    AlreadyExists(AlreadyExistsConflict),
    Value(ValueConflict),
    RawEdit(RawEditConflict),
}

impl Conflict {
    pub fn path(&self) -> &RelativePath {
        match self {
            Self::AlreadyExists(c) => &c.path,
            Self::Value(c) => &c.path,
            Self::RawEdit(c) => &c.path,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists(c) => {
                let claimants: Vec<String> = c.claimants.iter().map(ToString::to_string).collect();
                write!(f, "{} is claimed by {}", c.path, claimants.join(", "))
            }
            Self::Value(c) => write!(
                f,
                "{}:{} is {} (from {}) but {} wants {}",
                c.path, c.key_path, c.existing, c.existing_owner, c.incoming_owner, c.incoming
            ),
            Self::RawEdit(c) => write!(
                f,
                "{}: raw edit at {} by {} overlaps raw edit at {} by {}",
                c.path, c.second_target, c.second, c.first_target, c.first
            ),
        }
    }
}

/// One operation whose target was malformed or unsupported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralFailure {
    pub path: String,
    pub location: String,
    pub generator: Provenance,
    pub reason: String,
}

impl fmt::Display for StructuralFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}: {} (operation from {})",
            self.path, self.location, self.reason, self.generator
        )
    }
}

/// Everything that kept a run from merging cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    pub failures: Vec<StructuralFailure>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty() && self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len() + self.failures.len()
    }

    /// Record a conflict. Claims on a path that is already contested join
    /// the existing conflict instead of adding a new one.
    pub fn push(&mut self, conflict: Conflict) {
        if let Conflict::AlreadyExists(incoming) = &conflict {
            let existing = self.conflicts.iter_mut().find_map(|c| match c {
                Conflict::AlreadyExists(e) if e.path == incoming.path => Some(e),
                _ => None,
            });
            if let Some(existing) = existing {
                for claimant in &incoming.claimants {
                    if !existing.claimants.contains(claimant) {
                        existing.claimants.push(claimant.clone());
                    }
                }
                return;
            }
        }
        self.conflicts.push(conflict);
    }

    pub fn suggestions(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self
            .conflicts
            .iter()
            .any(|c| matches!(c, Conflict::AlreadyExists(_)))
        {
            out.push("Drop one of the generators that create the same file".into());
        }
        if self.conflicts.iter().any(|c| matches!(c, Conflict::Value(_))) {
            out.push(
                "Choose a merge strategy (prefer-existing, prefer-incoming, merge-list) for the value"
                    .into(),
            );
        }
        if self.conflicts.iter().any(|c| matches!(c, Conflict::RawEdit(_))) {
            out.push("Run the generators with overlapping raw edits separately".into());
        }
        if !self.failures.is_empty() {
            out.push("Fix the malformed files listed above and re-run".into());
        }
        out.push("Nothing was written; the project is unchanged".into());
        out
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run has {} conflict(s) and {} structural failure(s)",
            self.conflicts.len(),
            self.failures.len()
        )?;
        for conflict in &self.conflicts {
            write!(f, "\n  • {conflict}")?;
        }
        for failure in &self.failures {
            write!(f, "\n  • {failure}")?;
        }
        Ok(())
    }
}

/// Planned change to one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChange {
    pub path: RelativePath,
    /// `None` when the file is created by the run.
    pub before: Option<String>,
    pub after: String,
    /// Operations that changed this file, in application order.
    pub operations: Vec<PatchOperation>,
}

impl FileChange {
    pub fn is_new(&self) -> bool {
        self.before.is_none()
    }
}

/// Result of merging every operation of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedChangeSet {
    pub run_id: Uuid,
    pub files: BTreeMap<RelativePath, FileChange>,
    pub report: ConflictReport,
}

impl MergedChangeSet {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            files: BTreeMap::new(),
            report: ConflictReport::default(),
        }
    }

    /// No file would change.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.report.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = &FileChange> {
        self.files.values()
    }

    pub fn file(&self, path: &RelativePath) -> Option<&FileChange> {
        self.files.get(path)
    }

    pub fn operations(&self) -> impl Iterator<Item = &PatchOperation> {
        self.files.values().flat_map(|f| f.operations.iter())
    }
}
