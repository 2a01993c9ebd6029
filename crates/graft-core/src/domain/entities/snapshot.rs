//! Read-only views of the project being patched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use im::OrdMap;

use super::common::RelativePath;
use crate::domain::error::DomainError;
use crate::domain::syntax::{Node, SyntaxSet, config};
use crate::domain::value_objects::{ConfigValue, KeyPath};

/// Text files of a project as they were when the run started.
///
/// Cloning is cheap: file contents are shared.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    root: PathBuf,
    name: String,
    files: OrdMap<RelativePath, Arc<str>>,
}

impl ProjectSnapshot {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            files: OrdMap::new(),
        }
    }

    pub fn with_file(mut self, path: RelativePath, content: impl Into<Arc<str>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: RelativePath, content: impl Into<Arc<str>>) {
        self.files.insert(path, content.into());
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self, path: &RelativePath) -> Option<&Arc<str>> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &RelativePath) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &RelativePath> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// What a generator sees: the snapshot plus every change planned so far in
/// the run.
#[derive(Debug, Clone, Copy)]
pub struct ProjectView<'a> {
    snapshot: &'a ProjectSnapshot,
    overlay: &'a OrdMap<RelativePath, Arc<str>>,
    syntaxes: &'a SyntaxSet,
}

impl<'a> ProjectView<'a> {
    pub fn new(
        snapshot: &'a ProjectSnapshot,
        overlay: &'a OrdMap<RelativePath, Arc<str>>,
        syntaxes: &'a SyntaxSet,
    ) -> Self {
        Self {
            snapshot,
            overlay,
            syntaxes,
        }
    }

    pub fn project_name(&self) -> &'a str {
        self.snapshot.name()
    }

    pub fn read(&self, path: &RelativePath) -> Option<&'a str> {
        self.overlay
            .get(path)
            .or_else(|| self.snapshot.read(path))
            .map(|text| &**text)
    }

    pub fn exists(&self, path: &RelativePath) -> bool {
        self.overlay.contains_key(path) || self.snapshot.contains(path)
    }

    /// Sorted union of snapshot and planned paths.
    pub fn paths(&self) -> Vec<RelativePath> {
        let mut paths: Vec<_> = self
            .snapshot
            .paths()
            .chain(self.overlay.keys().filter(|p| !self.snapshot.contains(p)))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Parsed tree of the file's current content; node paths into it are
    /// valid targets for raw edits issued now.
    pub fn tree(&self, path: &RelativePath) -> Result<Option<Node>, DomainError> {
        let Some(text) = self.read(path) else {
            return Ok(None);
        };
        self.syntaxes
            .for_path(path.as_path())
            .parse(text)
            .map(Some)
            .map_err(|e| e.in_file(path))
    }

    /// Current value at `key_path`, if the file exists and holds it.
    pub fn config_value(
        &self,
        path: &RelativePath,
        key_path: &KeyPath,
    ) -> Result<Option<ConfigValue>, DomainError> {
        let syntax = self.syntaxes.for_path(path.as_path());
        let Some(dialect) = syntax.config() else {
            return Err(DomainError::structural(
                path.to_string(),
                format!("{} files have no configuration keys", syntax.name()),
            ));
        };
        let Some(tree) = self.tree(path)? else {
            return Ok(None);
        };
        config::read(&tree, dialect, key_path).map_err(|e| e.in_file(path))
    }
}
