pub mod changeset;
pub mod common;
pub mod composition;
pub mod flags;
pub mod generator;
pub mod patch;
pub mod render;
pub mod snapshot;

pub use crate::domain::DomainError;
pub use changeset::{
    AlreadyExistsConflict, Conflict, ConflictReport, FileChange, MergedChangeSet, Owner,
    RawEditConflict, StructuralFailure, ValueConflict,
};
pub use common::RelativePath;
pub use composition::{CompositionCycleError, Invocation};
pub use flags::{
    AcceptedFlag, AmbiguousFlagReport, BoundArgs, FlagAmbiguity, FlagNamespace, FlagOwner,
    FlagSpec, FlagTarget, GeneratorArgs,
};
pub use generator::{Generator, GeneratorDescriptor, GeneratorRequest};
pub use patch::{FileContent, PatchKind, PatchOperation, Provenance};
pub use render::RenderContext;
pub use snapshot::{ProjectSnapshot, ProjectView};
