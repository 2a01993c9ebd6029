//! Infrastructure adapters for Graft.
//!
//! This crate implements the ports defined in `graft-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod builtin_generators;
pub mod filesystem;
pub mod generator_loader;
pub mod generator_store;
pub mod project_loader;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use generator_loader::{FilesystemGeneratorLoader, ManifestGenerator};
pub use generator_store::InMemoryRegistry;
pub use project_loader::{LocalProjectLoader, MemoryProjectLoader};
