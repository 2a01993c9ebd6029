//! Plain text: a document of lines.

use super::{Node, NodeKind, Syntax, SyntaxError};

/// Each line (with its terminator) is one [`NodeKind::Line`] leaf, so a
/// [`NodePath`](super::NodePath) of `/n` addresses line `n` (0-based).
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSyntax;

impl Syntax for TextSyntax {
    fn name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, source: &str) -> Result<Node, SyntaxError> {
        Ok(Node::branch(
            NodeKind::Document,
            source
                .split_inclusive('\n')
                .map(|line| Node::leaf(NodeKind::Line, line)),
        ))
    }
}
