//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `graft-adapters` crate provides implementations.

use std::path::Path;
use std::sync::Arc;

use crate::domain::{Generator, GeneratorId, ProjectSnapshot};
use crate::error::GraftResult;

/// Port for filesystem operations used when applying a change set.
///
/// Implemented by:
/// - `graft_adapters::filesystem::LocalFilesystem` (production)
/// - `graft_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Read a file, `None` when it does not exist.
    fn read_to_string(&self, path: &Path) -> GraftResult<Option<String>>;

    /// Write content to a file, replacing it.
    fn write_file(&self, path: &Path, content: &str) -> GraftResult<()>;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> GraftResult<()>;

    /// Move a file, replacing the destination.
    fn rename(&self, from: &Path, to: &Path) -> GraftResult<()>;

    fn remove_file(&self, path: &Path) -> GraftResult<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> GraftResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Port for generator discovery.
///
/// Implemented by:
/// - `graft_adapters::generator_store::InMemoryRegistry` (built-ins and
///   loaded manifests)
#[cfg_attr(test, mockall::automock)]
pub trait GeneratorRegistry: Send + Sync {
    /// Get a generator by id.
    fn lookup(&self, id: &GeneratorId) -> GraftResult<Arc<dyn Generator>>;

    /// List all generators, ordered by id.
    fn list(&self) -> GraftResult<Vec<Arc<dyn Generator>>>;

    /// Insert or replace a generator.
    fn insert(&self, generator: Arc<dyn Generator>) -> GraftResult<()>;
}

/// Port for reading the project a run starts from.
///
/// Implemented by:
/// - `graft_adapters::project_loader::LocalProjectLoader` (a directory tree)
/// - `graft_adapters::project_loader::MemoryProjectLoader` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait ProjectLoader: Send + Sync {
    fn load(&self) -> GraftResult<ProjectSnapshot>;
}
