//! Lossless JSON with comments and trailing commas.
//!
//! Tree shape:
//!
//! ```text
//! Document [Trivia?, <value>, Trivia?]
//! Map      [Punct "{", (Trivia | Entry | Punct ",")*, Punct "}"]
//! Entry    [Key, Trivia?, Punct ":", Trivia?, <value>]
//! List     [Punct "[", (Trivia | <value> | Punct ",")*, Punct "]"]
//! ```
//!
//! Adjacent whitespace and comments always coalesce into a single trivia leaf.

use super::{ConfigDialect, Node, NodeKind, Syntax, SyntaxError};
use crate::domain::value_objects::ConfigValue;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSyntax;

impl Syntax for JsonSyntax {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, source: &str) -> Result<Node, SyntaxError> {
        Parser::new(source).document()
    }

    fn config(&self) -> Option<&dyn ConfigDialect> {
        Some(self)
    }
}

impl ConfigDialect for JsonSyntax {
    fn empty_document(&self) -> &'static str {
        "{}\n"
    }

    fn decode_key(&self, key: &Node) -> Option<String> {
        serde_json::from_str::<String>(key.text()).ok()
    }

    fn decode_value(&self, value: &Node) -> Option<ConfigValue> {
        match value.kind() {
            NodeKind::Scalar => serde_json::from_str(value.text()).ok(),
            NodeKind::List => value
                .significant_children()
                .map(|(_, item)| self.decode_value(item))
                .collect::<Option<Vec<_>>>()
                .map(ConfigValue::Array),
            NodeKind::Map => value
                .significant_children()
                .map(|(_, entry)| {
                    let (_, key) = entry.significant_children().next()?;
                    let (_, val) = entry.significant_children().nth(1)?;
                    Some((self.decode_key(key)?, self.decode_value(val)?))
                })
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(ConfigValue::Object),
            _ => None,
        }
    }

    fn encode_value(&self, value: &ConfigValue, indent: &str) -> Node {
        let mut text = String::new();
        write_pretty(&mut text, value, indent, self.indent_unit());
        Parser::new(&text)
            .value()
            .unwrap_or_else(|_| Node::leaf(NodeKind::Raw, text))
    }

    fn encode_entry(&self, key: &str, value: &ConfigValue, indent: &str) -> Node {
        Node::branch(
            NodeKind::Entry,
            [
                Node::leaf(NodeKind::Key, ConfigValue::String(key.to_string()).to_string()),
                Node::leaf(NodeKind::Punct, ":"),
                Node::leaf(NodeKind::Trivia, " "),
                self.encode_value(value, indent),
            ],
        )
    }

    fn item_separator(&self) -> Node {
        Node::leaf(NodeKind::Punct, ",")
    }
}

fn is_scalar(value: &ConfigValue) -> bool {
    !matches!(value, ConfigValue::Array(_) | ConfigValue::Object(_))
}

/// Pretty-print `value` as if it started on a line indented by `indent`.
/// Lists of scalars stay on one line.
fn write_pretty(out: &mut String, value: &ConfigValue, indent: &str, unit: &str) {
    match value {
        ConfigValue::Array(items) if items.iter().all(is_scalar) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&item.to_string());
            }
            out.push(']');
        }
        ConfigValue::Array(items) => {
            let inner = format!("{indent}{unit}");
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&inner);
                write_pretty(out, item, &inner, unit);
            }
            out.push('\n');
            out.push_str(indent);
            out.push(']');
        }
        ConfigValue::Object(map) if map.is_empty() => out.push_str("{}"),
        ConfigValue::Object(map) => {
            let inner = format!("{indent}{unit}");
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&inner);
                out.push_str(&ConfigValue::String(key.clone()).to_string());
                out.push_str(": ");
                write_pretty(out, item, &inner, unit);
            }
            out.push('\n');
            out.push_str(indent);
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let mut end = self.pos.min(self.src.len());
        while !self.src.is_char_boundary(end) {
            end -= 1;
        }
        let consumed = &self.src[..end];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rsplit('\n')
            .next()
            .map_or(0, |tail| tail.chars().count())
            + 1;
        SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn punct(&mut self, text: &'static str) -> Node {
        self.pos += text.len();
        Node::leaf(NodeKind::Punct, text)
    }

    fn document(&mut self) -> Result<Node, SyntaxError> {
        let mut children = Vec::new();
        self.push_trivia(&mut children)?;
        if self.peek().is_some() {
            children.push(self.value()?);
            self.push_trivia(&mut children)?;
        }
        if self.peek().is_some() {
            return Err(self.error("unexpected content after the top-level value"));
        }
        Ok(Node::branch(NodeKind::Document, children))
    }

    /// Whitespace and comments, coalesced.
    fn push_trivia(&mut self, into: &mut Vec<Node>) -> Result<(), SyntaxError> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    let body = self.pos + 2;
                    let end = self.src[body..]
                        .find("*/")
                        .ok_or_else(|| self.error("unterminated block comment"))?;
                    self.pos = body + end + 2;
                }
                _ => break,
            }
        }
        if self.pos > start {
            into.push(Node::leaf(NodeKind::Trivia, &self.src[start..self.pos]));
        }
        Ok(())
    }

    fn value(&mut self) -> Result<Node, SyntaxError> {
        match self.peek() {
            Some(b'{') => self.map(),
            Some(b'[') => self.list(),
            Some(b'"') => {
                let text = self.string()?;
                Ok(Node::leaf(NodeKind::Scalar, text))
            }
            Some(_) => self.literal(),
            None => Err(self.error("expected a value")),
        }
    }

    fn map(&mut self) -> Result<Node, SyntaxError> {
        let mut children = vec![self.punct("{")];
        loop {
            self.push_trivia(&mut children)?;
            match self.peek() {
                Some(b'}') => {
                    children.push(self.punct("}"));
                    break;
                }
                Some(b'"') => {
                    children.push(self.entry()?);
                    self.push_trivia(&mut children)?;
                    match self.peek() {
                        Some(b',') => children.push(self.punct(",")),
                        Some(b'}') => {
                            children.push(self.punct("}"));
                            break;
                        }
                        _ => return Err(self.error("expected ',' or '}'")),
                    }
                }
                _ => return Err(self.error("expected a string key or '}'")),
            }
        }
        Ok(Node::branch(NodeKind::Map, children))
    }

    fn entry(&mut self) -> Result<Node, SyntaxError> {
        let key = self.string()?;
        let mut children = vec![Node::leaf(NodeKind::Key, key)];
        self.push_trivia(&mut children)?;
        if self.peek() != Some(b':') {
            return Err(self.error("expected ':' after key"));
        }
        children.push(self.punct(":"));
        self.push_trivia(&mut children)?;
        children.push(self.value()?);
        Ok(Node::branch(NodeKind::Entry, children))
    }

    fn list(&mut self) -> Result<Node, SyntaxError> {
        let mut children = vec![self.punct("[")];
        loop {
            self.push_trivia(&mut children)?;
            match self.peek() {
                Some(b']') => {
                    children.push(self.punct("]"));
                    break;
                }
                Some(_) => {
                    children.push(self.value()?);
                    self.push_trivia(&mut children)?;
                    match self.peek() {
                        Some(b',') => children.push(self.punct(",")),
                        Some(b']') => {
                            children.push(self.punct("]"));
                            break;
                        }
                        _ => return Err(self.error("expected ',' or ']'")),
                    }
                }
                None => return Err(self.error("unterminated list")),
            }
        }
        Ok(Node::branch(NodeKind::List, children))
    }

    /// Raw string token, quotes included.
    fn string(&mut self) -> Result<&'a str, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(&self.src[start..self.pos]);
                }
                Some(b'\\') => self.pos += 2,
                Some(b'\n') | None => return Err(self.error("unterminated string")),
                Some(_) => self.pos += 1,
            }
        }
    }

    fn literal(&mut self) -> Result<Node, SyntaxError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'.'))
        {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        if text.is_empty() {
            return Err(self.error("expected a value"));
        }
        match serde_json::from_str::<ConfigValue>(text) {
            Ok(_) => Ok(Node::leaf(NodeKind::Scalar, text)),
            Err(_) => {
                self.pos = start;
                Err(self.error(format!("invalid literal '{text}'")))
            }
        }
    }
}
