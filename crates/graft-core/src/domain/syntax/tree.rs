//! Lossless, persistent syntax tree.
//!
//! A [`Node`] is either a leaf carrying source text or a branch carrying
//! children. Whitespace, comments and punctuation are ordinary leaves
//! ([`NodeKind::Trivia`], [`NodeKind::Punct`]), so concatenating every leaf in
//! order reproduces the parsed source byte for byte.
//!
//! Nodes are immutable and reference-counted; children live in an
//! [`im::Vector`], so rebuilding one ancestor after an edit is `O(log n)` and
//! every untouched subtree is shared with the previous version.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use im::Vector;
use serde::{Deserialize, Serialize};

/// Structural role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// File root.
    Document,
    /// Key/value container.
    Map,
    /// One key/value pair inside a map.
    Entry,
    /// Key of an entry (leaf).
    Key,
    /// Ordered container.
    List,
    /// String, number, boolean or null literal (leaf).
    Scalar,
    /// Brackets, separators (leaf).
    Punct,
    /// Whitespace and comments (leaf).
    Trivia,
    /// One line of a plain-text file, including its newline (leaf).
    Line,
    /// Verbatim text inserted by a raw edit (leaf).
    Raw,
}

impl NodeKind {
    /// Trivia and punctuation carry formatting, not content.
    pub const fn is_significant(self) -> bool {
        !matches!(self, Self::Trivia | Self::Punct)
    }

    /// Containers whose last significant child may not be deleted.
    pub const fn requires_child(self) -> bool {
        matches!(self, Self::Document | Self::Entry)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Map => "map",
            Self::Entry => "entry",
            Self::Key => "key",
            Self::List => "list",
            Self::Scalar => "scalar",
            Self::Punct => "punct",
            Self::Trivia => "trivia",
            Self::Line => "line",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(PartialEq, Eq)]
struct NodeData {
    kind: NodeKind,
    text: String,
    children: Vector<Node>,
}

/// Immutable tree node. Cloning is a reference-count bump.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    pub fn leaf(kind: NodeKind, text: impl Into<String>) -> Self {
        Self(Arc::new(NodeData {
            kind,
            text: text.into(),
            children: Vector::new(),
        }))
    }

    pub fn branch(kind: NodeKind, children: impl IntoIterator<Item = Node>) -> Self {
        Self(Arc::new(NodeData {
            kind,
            text: String::new(),
            children: children.into_iter().collect(),
        }))
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    /// Leaf text; empty for branches.
    pub fn text(&self) -> &str {
        &self.0.text
    }

    pub fn children(&self) -> &Vector<Node> {
        &self.0.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.0.children.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.0.children.len()
    }

    /// Children that are neither trivia nor punctuation, with their indices.
    pub fn significant_children(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.0
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind().is_significant())
    }

    /// Same node identity (not just equal content).
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// New node with `child` at `index`; all other children are shared.
    pub fn with_child(&self, index: usize, child: Node) -> Node {
        let mut children = self.0.children.clone();
        children.set(index, child);
        self.with_children(children)
    }

    pub fn with_inserted(&self, index: usize, child: Node) -> Node {
        let mut children = self.0.children.clone();
        children.insert(index, child);
        self.with_children(children)
    }

    pub fn without(&self, index: usize) -> Node {
        let mut children = self.0.children.clone();
        children.remove(index);
        self.with_children(children)
    }

    fn with_children(&self, children: Vector<Node>) -> Node {
        Self(Arc::new(NodeData {
            kind: self.0.kind,
            text: self.0.text.clone(),
            children,
        }))
    }

    /// Render back to source text.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    /// Byte length of [`Node::to_source`] without rendering.
    pub fn source_len(&self) -> usize {
        self.0.text.len() + self.0.children.iter().map(Node::source_len).sum::<usize>()
    }

    pub fn write_source(&self, out: &mut String) {
        out.push_str(&self.0.text);
        for child in &self.0.children {
            child.write_source(out);
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.children.is_empty() {
            write!(f, "{}({:?})", self.0.kind, self.0.text)
        } else {
            write!(f, "{}", self.0.kind)?;
            f.debug_list().entries(self.0.children.iter()).finish()
        }
    }
}

// ── NodePath ─────────────────────────────────────────────────────────────────

/// Child indices from the root to a node, rendered as `/0/2/1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        Self(indices.into())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn is_prefix_of(&self, other: &NodePath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Two regions overlap when one contains the other.
    pub fn overlaps(&self, other: &NodePath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        trimmed
            .split('/')
            .map(|seg| {
                seg.parse::<usize>()
                    .map_err(|_| format!("invalid node path segment '{seg}' in '{s}'"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for NodePath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::branch(
            NodeKind::Document,
            [
                Node::leaf(NodeKind::Line, "a\n"),
                Node::leaf(NodeKind::Line, "b\n"),
            ],
        )
    }

    #[test]
    fn to_source_concatenates_leaves() {
        assert_eq!(sample().to_source(), "a\nb\n");
    }

    #[test]
    fn with_child_shares_untouched_siblings() {
        let tree = sample();
        let edited = tree.with_child(1, Node::leaf(NodeKind::Raw, "B\n"));
        assert!(tree.child(0).unwrap().ptr_eq(edited.child(0).unwrap()));
        assert_eq!(tree.to_source(), "a\nb\n");
        assert_eq!(edited.to_source(), "a\nB\n");
    }

    #[test]
    fn node_path_display_and_parse() {
        let path = NodePath::new(vec![0, 2, 1]);
        assert_eq!(path.to_string(), "/0/2/1");
        assert_eq!("/0/2/1".parse::<NodePath>().unwrap(), path);
        assert_eq!("/".parse::<NodePath>().unwrap(), NodePath::root());
        assert!("/0/x".parse::<NodePath>().is_err());
    }

    #[test]
    fn node_path_overlap_is_prefix_relation() {
        let a = NodePath::new(vec![1]);
        let b = NodePath::new(vec![1, 3]);
        let c = NodePath::new(vec![2]);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!b.overlaps(&c));
        assert!(NodePath::root().overlaps(&c));
    }
}
