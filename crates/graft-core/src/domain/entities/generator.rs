//! Generators: named producers of patch operations.

use std::fmt;

use serde::Serialize;

use super::flags::{FlagSpec, GeneratorArgs};
use super::patch::PatchKind;
use super::snapshot::ProjectView;
use crate::domain::error::DomainError;
use crate::domain::value_objects::{GeneratorId, Group};

/// Static description of a generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorDescriptor {
    pub id: GeneratorId,
    pub group: Group,
    pub summary: String,
    pub flags: Vec<FlagSpec>,
    /// Names of positional arguments, for help output.
    pub positional: Vec<String>,
    /// Generators expanded (depth-first) after this one.
    pub composes: Vec<GeneratorId>,
}

impl GeneratorDescriptor {
    /// Descriptor in a group named after the generator.
    pub fn new(id: GeneratorId) -> Self {
        Self {
            group: Group::of(&id),
            id,
            summary: String::new(),
            flags: Vec::new(),
            positional: Vec::new(),
            composes: Vec::new(),
        }
    }

    pub fn in_group(mut self, group: Group) -> Self {
        self.group = group;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn positional(mut self, name: impl Into<String>) -> Self {
        self.positional.push(name.into());
        self
    }

    pub fn composes(mut self, id: GeneratorId) -> Self {
        self.composes.push(id);
        self
    }

    pub fn find_flag(&self, name: &str) -> Option<&FlagSpec> {
        self.flags.iter().find(|f| f.name == name)
    }
}

/// A producer of patch operations.
///
/// Generators never touch the filesystem: they read the project through a
/// [`ProjectView`] and return the changes they want. Provenance is attached by
/// the engine.
pub trait Generator: Send + Sync {
    fn descriptor(&self) -> &GeneratorDescriptor;

    fn run(&self, view: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError>;

    fn id(&self) -> &GeneratorId {
        &self.descriptor().id
    }
}

impl fmt::Debug for dyn Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("id", &self.descriptor().id)
            .field("group", &self.descriptor().group)
            .finish()
    }
}

/// One top-level generator named on the command line, with its raw
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorRequest {
    pub id: GeneratorId,
    pub args: Vec<String>,
}

impl GeneratorRequest {
    pub fn new(id: GeneratorId, args: Vec<String>) -> Self {
        Self { id, args }
    }

    pub fn bare(id: GeneratorId) -> Self {
        Self::new(id, Vec::new())
    }
}
