//! Zipper over a [`Node`] tree.
//!
//! A [`Cursor`] is a focused node plus the breadcrumb trail back to the root.
//! Every edit returns a new cursor; the tree the cursor was created from is
//! never modified, and [`Cursor::root`] rebuilds only the ancestors of edited
//! nodes.

use std::sync::Arc;

use super::StructuralError;
use super::tree::{Node, NodeKind, NodePath};

#[derive(Debug)]
struct Crumb {
    /// Parent as it was when the cursor descended. The child at `index` may be
    /// stale; the cursor's focus is authoritative.
    parent: Node,
    index: usize,
    up: Option<Arc<Crumb>>,
}

#[derive(Debug, Clone)]
pub struct Cursor {
    focus: Node,
    crumb: Option<Arc<Crumb>>,
}

impl Cursor {
    pub fn new(root: Node) -> Self {
        Self {
            focus: root,
            crumb: None,
        }
    }

    /// Cursor focused on the node at `path`.
    pub fn at(root: &Node, path: &NodePath) -> Result<Self, StructuralError> {
        path.indices()
            .iter()
            .try_fold(Self::new(root.clone()), |cursor, &index| cursor.down(index))
    }

    pub fn focus(&self) -> &Node {
        &self.focus
    }

    pub fn kind(&self) -> NodeKind {
        self.focus.kind()
    }

    pub fn is_root(&self) -> bool {
        self.crumb.is_none()
    }

    /// Index of the focus within its parent.
    pub fn index(&self) -> Option<usize> {
        self.crumb.as_ref().map(|c| c.index)
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut crumb = self.crumb.as_deref();
        while let Some(c) = crumb {
            depth += 1;
            crumb = c.up.as_deref();
        }
        depth
    }

    pub fn path(&self) -> NodePath {
        let mut indices = Vec::new();
        let mut crumb = self.crumb.as_deref();
        while let Some(c) = crumb {
            indices.push(c.index);
            crumb = c.up.as_deref();
        }
        indices.reverse();
        NodePath::new(indices)
    }

    /// Byte range the focus occupies in the rendered root.
    pub fn span(&self) -> std::ops::Range<usize> {
        let mut start = 0;
        let mut crumb = self.crumb.as_deref();
        while let Some(c) = crumb {
            start += c.parent.text().len();
            start += c
                .parent
                .children()
                .iter()
                .take(c.index)
                .map(Node::source_len)
                .sum::<usize>();
            crumb = c.up.as_deref();
        }
        start..start + self.focus.source_len()
    }

    fn error(&self, reason: impl Into<String>) -> StructuralError {
        StructuralError::new(self.path(), reason)
    }

    /// Parent with the current focus written back into it.
    fn rebuilt_parent(&self) -> Option<(Node, usize, Option<Arc<Crumb>>)> {
        self.crumb.as_ref().map(|crumb| {
            let parent = match crumb.parent.child(crumb.index) {
                Some(existing) if existing.ptr_eq(&self.focus) => crumb.parent.clone(),
                _ => crumb.parent.with_child(crumb.index, self.focus.clone()),
            };
            (parent, crumb.index, crumb.up.clone())
        })
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    pub fn down(&self, index: usize) -> Result<Self, StructuralError> {
        let child = self.focus.child(index).cloned().ok_or_else(|| {
            self.error(format!(
                "{} has no child {index} (it has {})",
                self.kind(),
                self.focus.child_count()
            ))
        })?;
        Ok(Self {
            focus: child,
            crumb: Some(Arc::new(Crumb {
                parent: self.focus.clone(),
                index,
                up: self.crumb.clone(),
            })),
        })
    }

    pub fn first_child(&self) -> Option<Self> {
        self.down(0).ok()
    }

    pub fn last_child(&self) -> Option<Self> {
        self.focus
            .child_count()
            .checked_sub(1)
            .and_then(|i| self.down(i).ok())
    }

    /// First child satisfying `pred`.
    pub fn find_child(&self, mut pred: impl FnMut(&Node) -> bool) -> Option<Self> {
        let index = self.focus.children().iter().position(|c| pred(c))?;
        self.down(index).ok()
    }

    pub fn up(&self) -> Option<Self> {
        self.rebuilt_parent().map(|(parent, _, up)| Self {
            focus: parent,
            crumb: up,
        })
    }

    fn sibling(&self, offset: isize) -> Option<Self> {
        let (parent, index, up) = self.rebuilt_parent()?;
        let target = index.checked_add_signed(offset)?;
        let focus = parent.child(target)?.clone();
        Some(Self {
            focus,
            crumb: Some(Arc::new(Crumb {
                parent,
                index: target,
                up,
            })),
        })
    }

    pub fn next_sibling(&self) -> Option<Self> {
        self.sibling(1)
    }

    pub fn prev_sibling(&self) -> Option<Self> {
        self.sibling(-1)
    }

    /// Peek at the sibling before the focus without moving.
    pub fn prev_node(&self) -> Option<&Node> {
        let crumb = self.crumb.as_ref()?;
        crumb.index.checked_sub(1).and_then(|i| crumb.parent.child(i))
    }

    /// Rebuilt root of the (possibly edited) tree.
    pub fn root(&self) -> Node {
        let mut cursor = self.clone();
        while let Some(parent) = cursor.up() {
            cursor = parent;
        }
        cursor.focus
    }

    // ── Editing ─────────────────────────────────────────────────────────────

    pub fn replace(&self, node: Node) -> Self {
        Self {
            focus: node,
            crumb: self.crumb.clone(),
        }
    }

    /// Insert `node` before the focus; the returned cursor is on `node`.
    pub fn insert_before(&self, node: Node) -> Result<Self, StructuralError> {
        let (parent, index, up) = self
            .rebuilt_parent()
            .ok_or_else(|| self.error("cannot insert a sibling of the root"))?;
        Ok(Self {
            focus: node.clone(),
            crumb: Some(Arc::new(Crumb {
                parent: parent.with_inserted(index, node),
                index,
                up,
            })),
        })
    }

    /// Insert `node` after the focus; the returned cursor is on `node`.
    pub fn insert_after(&self, node: Node) -> Result<Self, StructuralError> {
        let (parent, index, up) = self
            .rebuilt_parent()
            .ok_or_else(|| self.error("cannot insert a sibling of the root"))?;
        Ok(Self {
            focus: node.clone(),
            crumb: Some(Arc::new(Crumb {
                parent: parent.with_inserted(index + 1, node),
                index: index + 1,
                up,
            })),
        })
    }

    /// Remove the focus; the returned cursor is on the parent.
    pub fn delete(&self) -> Result<Self, StructuralError> {
        let (parent, index, up) = self
            .rebuilt_parent()
            .ok_or_else(|| self.error("cannot delete the root node; replace it instead"))?;

        if parent.kind() == NodeKind::Entry && self.kind().is_significant() {
            return Err(self.error(format!(
                "cannot delete the {} of an entry; delete the entry instead",
                self.kind()
            )));
        }
        if parent.kind().requires_child()
            && self.kind().is_significant()
            && parent.significant_children().count() == 1
        {
            return Err(self.error(format!(
                "cannot delete the only {} of a {}",
                self.kind(),
                parent.kind()
            )));
        }

        Ok(Self {
            focus: parent.without(index),
            crumb: up,
        })
    }
}
