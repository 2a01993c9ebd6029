//! Project loaders: read a project directory into a [`ProjectSnapshot`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use graft_core::{
    application::{ApplicationError, is_staged_path, ports::ProjectLoader},
    domain::{ProjectSnapshot, RelativePath},
    error::GraftResult,
};

/// Directories never read into a snapshot.
pub const DEFAULT_IGNORE: &[&str] = &[".git", "target", "node_modules", "_build", "deps"];

/// Files above this size are left out of the snapshot.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Loads a directory tree from disk.
///
/// Files that are not UTF-8, are too large, or sit in an ignored directory
/// are skipped. Generators cannot see them and apply never rewrites them.
#[derive(Debug, Clone)]
pub struct LocalProjectLoader {
    root: PathBuf,
    name: Option<String>,
    ignore: Vec<String>,
    max_file_bytes: u64,
}

impl LocalProjectLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            name: None,
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    /// Project name used for `{{PROJECT_NAME}}`; defaults to the directory
    /// name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the ignored directory names.
    pub fn with_ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        fs::canonicalize(&self.root)
            .ok()
            .as_deref()
            .unwrap_or(self.root.as_path())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.ignore.iter().any(|i| i == name))
    }

    fn load_failed(&self, path: &Path, reason: impl Into<String>) -> ApplicationError {
        ApplicationError::LoadFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl ProjectLoader for LocalProjectLoader {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn load(&self) -> GraftResult<ProjectSnapshot> {
        let mut snapshot = ProjectSnapshot::new(&self.root, self.project_name());
        if !self.root.exists() {
            debug!("project root does not exist yet, starting empty");
            return Ok(snapshot);
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            let entry = entry.map_err(|e| self.load_failed(&self.root, e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let abs = entry.path();
            if is_staged_path(abs) {
                warn!(path = %abs.display(), "leftover staged file, skipping");
                continue;
            }

            let size = entry
                .metadata()
                .map_err(|e| self.load_failed(abs, e.to_string()))?
                .len();
            if size > self.max_file_bytes {
                debug!(path = %abs.display(), size, "file too large, skipping");
                continue;
            }

            let bytes = fs::read(abs).map_err(|e| self.load_failed(abs, e.to_string()))?;
            let Ok(text) = String::from_utf8(bytes) else {
                debug!(path = %abs.display(), "not UTF-8, skipping");
                continue;
            };

            let relative = abs
                .strip_prefix(&self.root)
                .map_err(|_| self.load_failed(abs, "outside the project root"))?;
            snapshot.insert(RelativePath::try_new(relative)?, text);
        }

        debug!(files = snapshot.len(), "project loaded");
        Ok(snapshot)
    }
}

/// Serves a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectLoader {
    snapshot: ProjectSnapshot,
}

impl MemoryProjectLoader {
    pub fn new(snapshot: ProjectSnapshot) -> Self {
        Self { snapshot }
    }
}

impl ProjectLoader for MemoryProjectLoader {
    fn load(&self) -> GraftResult<ProjectSnapshot> {
        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let full = root.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    fn rel(p: &str) -> RelativePath {
        RelativePath::try_new(p).unwrap()
    }

    #[test]
    fn loads_text_files_relative_to_root() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "README.md", b"# hi\n");
        write(temp.path(), "config/config.json", b"{}\n");

        let snapshot = LocalProjectLoader::new(temp.path())
            .with_name("demo")
            .load()
            .unwrap();
        assert_eq!(snapshot.name(), "demo");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.read(&rel("config/config.json")).map(|s| &**s), Some("{}\n"));
    }

    #[test]
    fn skips_ignored_binary_large_and_staged_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "keep.txt", b"ok\n");
        write(temp.path(), ".git/HEAD", b"ref\n");
        write(temp.path(), "logo.png", &[0xff, 0xfe, 0x00]);
        write(temp.path(), "big.txt", &[b'a'; 64]);
        write(temp.path(), ".keep.txt.graft-staged", b"half\n");

        let snapshot = LocalProjectLoader::new(temp.path())
            .with_max_file_bytes(32)
            .load()
            .unwrap();
        let paths: Vec<String> = snapshot.paths().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["keep.txt"]);
    }

    #[test]
    fn missing_root_is_an_empty_project() {
        let temp = TempDir::new().unwrap();
        let snapshot = LocalProjectLoader::new(temp.path().join("new-app"))
            .load()
            .unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.name(), "new-app");
    }
}
