//! Graft Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for Graft: a
//! composition engine that runs project generators as pure producers of patch
//! operations, merges those operations over one snapshot of the project, and
//! applies the result atomically.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            graft-cli (CLI)              │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (PlanService, ApplyService, Generators) │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Registry, ProjectLoader, Filesystem)   │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     graft-adapters (Infrastructure)     │
//! │ (InMemoryRegistry, LocalFilesystem, ..) │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │  (Cursor, PatchOperation, Merger, ...)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use graft_core::prelude::*;
//!
//! let plan = PlanService::new(registry, loader);
//! let change_set = plan.plan(&[GeneratorRequest::bare(GeneratorId::new("readme")?)])?;
//!
//! let apply = ApplyService::new(filesystem, "./my-project");
//! for diff in apply.render(&change_set)? {
//!     print!("{}", diff.unified);
//! }
//! apply.apply(&change_set)?;
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ApplyReport, ApplyService, GeneratorInfo, GeneratorService, PlanService,
        ports::{Filesystem, GeneratorRegistry, ProjectLoader},
    };
    pub use crate::domain::{
        ConflictReport, FileDiff, FlagNamespace, FlagSpec, Generator, GeneratorArgs,
        GeneratorDescriptor, GeneratorId, GeneratorRequest, MergedChangeSet, PatchKind,
        ProjectSnapshot, ProjectView, RelativePath, RenderContext,
    };
    pub use crate::error::{GraftError, GraftResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
