//! Application layer for Graft.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (PlanService, ApplyService, GeneratorService)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! business logic itself. All merge and resolution rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    ApplyReport, ApplyService, GeneratorInfo, GeneratorService, PlanService, is_staged_path,
    staged_path,
};

// Re-export port traits (for adapter implementation)
pub use ports::{Filesystem, GeneratorRegistry, ProjectLoader};

pub use error::{ApplicationError, ApplyError};
