//! File syntaxes: lossless parsing into [`Node`] trees and structural config
//! editing on top of the [`Cursor`] zipper.

pub mod config;
pub mod cursor;
pub mod json;
pub mod text;
pub mod tree;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use cursor::Cursor;
pub use json::JsonSyntax;
pub use text::TextSyntax;
pub use tree::{Node, NodeKind, NodePath};

use crate::domain::error::DomainError;
use crate::domain::value_objects::ConfigValue;

/// A parser/renderer pair for one file format.
pub trait Syntax: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn parse(&self, source: &str) -> Result<Node, SyntaxError>;

    /// Render a tree back to text. Unedited trees render to their source.
    fn render(&self, tree: &Node) -> String {
        tree.to_source()
    }

    /// Structured-config support, when the format has keys and lists.
    fn config(&self) -> Option<&dyn ConfigDialect> {
        None
    }
}

/// Format-specific pieces used by [`config`] edits.
pub trait ConfigDialect: Send + Sync {
    /// Text of a new, empty configuration file.
    fn empty_document(&self) -> &'static str;

    fn decode_key(&self, key: &Node) -> Option<String>;

    fn decode_value(&self, value: &Node) -> Option<ConfigValue>;

    /// Value subtree laid out for a line indented by `indent`.
    fn encode_value(&self, value: &ConfigValue, indent: &str) -> Node;

    fn encode_entry(&self, key: &str, value: &ConfigValue, indent: &str) -> Node;

    fn item_separator(&self) -> Node;

    fn indent_unit(&self) -> &'static str {
        "  "
    }
}

/// Parse failure with a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn in_file(self, path: impl fmt::Display) -> DomainError {
        DomainError::Syntax {
            path: path.to_string(),
            line: self.line,
            column: self.column,
            message: self.message,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// An edit that does not fit the tree it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralError {
    pub location: NodePath,
    pub reason: String,
}

impl StructuralError {
    pub fn new(location: NodePath, reason: impl Into<String>) -> Self {
        Self {
            location,
            reason: reason.into(),
        }
    }

    pub fn in_file(self, path: impl fmt::Display) -> DomainError {
        DomainError::Structural {
            path: path.to_string(),
            location: self.location.to_string(),
            reason: self.reason,
        }
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}: {}", self.location, self.reason)
    }
}

/// Chooses a [`Syntax`] by file extension; unknown extensions are plain text.
#[derive(Clone)]
pub struct SyntaxSet {
    by_extension: HashMap<String, Arc<dyn Syntax>>,
    fallback: Arc<dyn Syntax>,
}

impl SyntaxSet {
    pub fn new(fallback: Arc<dyn Syntax>) -> Self {
        Self {
            by_extension: HashMap::new(),
            fallback,
        }
    }

    /// JSON (with comments) for `.json`/`.jsonc`, text for everything else.
    pub fn builtin() -> Self {
        let json: Arc<dyn Syntax> = Arc::new(JsonSyntax);
        Self::new(Arc::new(TextSyntax))
            .register("json", json.clone())
            .register("jsonc", json)
    }

    pub fn register(mut self, extension: &str, syntax: Arc<dyn Syntax>) -> Self {
        self.by_extension
            .insert(extension.to_ascii_lowercase(), syntax);
        self
    }

    pub fn for_path(&self, path: &Path) -> Arc<dyn Syntax> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.by_extension.get(&e.to_ascii_lowercase()))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for SyntaxSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for SyntaxSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<_> = self.by_extension.keys().collect();
        extensions.sort();
        f.debug_struct("SyntaxSet")
            .field("extensions", &extensions)
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_dispatches_on_extension() {
        let set = SyntaxSet::builtin();
        assert_eq!(set.for_path(Path::new("a/b.json")).name(), "json");
        assert_eq!(set.for_path(Path::new("tsconfig.JSONC")).name(), "json");
        assert_eq!(set.for_path(Path::new("README.md")).name(), "text");
        assert_eq!(set.for_path(Path::new(".gitignore")).name(), "text");
    }

    #[test]
    fn structural_error_converts_with_path() {
        let err = StructuralError::new(NodePath::new(vec![0, 1]), "not a map").in_file("a.json");
        assert_eq!(
            err,
            DomainError::Structural {
                path: "a.json".into(),
                location: "/0/1".into(),
                reason: "not a map".into(),
            }
        );
    }
}
