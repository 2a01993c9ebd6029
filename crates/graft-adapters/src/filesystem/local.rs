//! Local filesystem adapter using std::fs.

use std::io;
use std::path::Path;

use graft_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{GraftError, GraftResult},
};

/// Production filesystem implementation using `std::fs`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for LocalFilesystem {
    fn read_to_string(&self, path: &Path) -> GraftResult<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error(path, e, "read file")),
        }
    }

    fn write_file(&self, path: &Path, content: &str) -> GraftResult<()> {
        std::fs::write(path, content).map_err(|e| map_io_error(path, e, "write file"))
    }

    fn create_dir_all(&self, path: &Path) -> GraftResult<()> {
        std::fs::create_dir_all(path).map_err(|e| map_io_error(path, e, "create directory"))
    }

    fn rename(&self, from: &Path, to: &Path) -> GraftResult<()> {
        std::fs::rename(from, to).map_err(|e| map_io_error(to, e, "move staged file"))
    }

    fn remove_file(&self, path: &Path) -> GraftResult<()> {
        std::fs::remove_file(path).map_err(|e| map_io_error(path, e, "remove file"))
    }

    fn remove_dir(&self, path: &Path) -> GraftResult<()> {
        std::fs::remove_dir(path).map_err(|e| map_io_error(path, e, "remove directory"))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> GraftError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: format!("Failed to {}: {}", operation, e),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_none() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        assert_eq!(fs.read_to_string(&temp.path().join("nope.txt")).unwrap(), None);
    }

    #[test]
    fn rename_replaces_destination() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let staged = temp.path().join(".a.txt.graft-staged");
        let target = temp.path().join("a.txt");
        fs.write_file(&target, "old").unwrap();
        fs.write_file(&staged, "new").unwrap();

        fs.rename(&staged, &target).unwrap();
        assert_eq!(fs.read_to_string(&target).unwrap().as_deref(), Some("new"));
        assert!(!fs.exists(&staged));
    }

    #[test]
    fn remove_dir_refuses_non_empty_directory() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let dir = temp.path().join("lib");
        fs.create_dir_all(&dir).unwrap();
        fs.write_file(&dir.join("keep.ex"), "x").unwrap();

        assert!(fs.remove_dir(&dir).is_err());
        assert!(fs.exists(&dir.join("keep.ex")));
    }
}
