//! Key-path edits on configuration trees.
//!
//! New entries and list items copy the layout of their siblings: a multi-line
//! container gets a new line at the sibling indentation, an inline one stays
//! inline, and an existing trailing separator stays trailing. Everything the
//! edit does not touch (comments, blank lines, key order) renders unchanged.

use super::{ConfigDialect, Cursor, Node, NodeKind, NodePath, StructuralError};
use crate::domain::value_objects::{ConfigValue, DedupeBy, KeyPath, MergeStrategy};

/// Result of resolving a key path.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Cursor),
    /// `segments[depth]` is absent from `map`.
    Missing { map: Cursor, depth: usize },
}

/// Outcome of [`ensure_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Ensured {
    Changed(Node),
    Unchanged,
    Conflict { existing: ConfigValue },
}

/// Cursor on the top-level value of a document.
pub fn root_value(doc: &Node) -> Result<Cursor, StructuralError> {
    let (index, _) = doc
        .significant_children()
        .next()
        .ok_or_else(|| StructuralError::new(NodePath::root(), "document has no top-level value"))?;
    Cursor::new(doc.clone()).down(index)
}

fn entry_key(entry: &Node, dialect: &dyn ConfigDialect) -> Option<String> {
    let (_, key) = entry.significant_children().next()?;
    (key.kind() == NodeKind::Key)
        .then(|| dialect.decode_key(key))
        .flatten()
}

fn shown(key_path: &KeyPath, depth: usize) -> String {
    if depth == 0 {
        "<root>".to_string()
    } else {
        key_path.segments()[..depth].join(".")
    }
}

pub fn lookup(
    doc: &Node,
    dialect: &dyn ConfigDialect,
    key_path: &KeyPath,
) -> Result<Lookup, StructuralError> {
    let mut cursor = root_value(doc)?;
    for (depth, key) in key_path.segments().iter().enumerate() {
        if cursor.kind() != NodeKind::Map {
            return Err(StructuralError::new(
                cursor.path(),
                format!(
                    "expected a map at '{}', found a {}",
                    shown(key_path, depth),
                    cursor.kind()
                ),
            ));
        }

        // Last duplicate wins, as in a JSON reader.
        let found = cursor
            .focus()
            .significant_children()
            .filter(|(_, e)| {
                e.kind() == NodeKind::Entry && entry_key(e, dialect).as_deref() == Some(key)
            })
            .map(|(i, _)| i)
            .last();

        let Some(index) = found else {
            return Ok(Lookup::Missing { map: cursor, depth });
        };
        let entry = cursor.down(index)?;
        let value_index = entry
            .focus()
            .significant_children()
            .nth(1)
            .map(|(i, _)| i)
            .ok_or_else(|| StructuralError::new(entry.path(), "entry has no value"))?;
        cursor = entry.down(value_index)?;
    }
    Ok(Lookup::Found(cursor))
}

pub fn read(
    doc: &Node,
    dialect: &dyn ConfigDialect,
    key_path: &KeyPath,
) -> Result<Option<ConfigValue>, StructuralError> {
    match lookup(doc, dialect, key_path)? {
        Lookup::Found(cursor) => decode(&cursor, dialect, key_path).map(Some),
        Lookup::Missing { .. } => Ok(None),
    }
}

fn decode(
    cursor: &Cursor,
    dialect: &dyn ConfigDialect,
    key_path: &KeyPath,
) -> Result<ConfigValue, StructuralError> {
    dialect.decode_value(cursor.focus()).ok_or_else(|| {
        StructuralError::new(
            cursor.path(),
            format!("value at '{key_path}' cannot be read as configuration data"),
        )
    })
}

/// Wrap `value` in one object per key, innermost last.
fn nest(value: ConfigValue, keys: &[String]) -> ConfigValue {
    keys.iter().rev().fold(value, |inner, key| {
        let mut map = serde_json::Map::new();
        map.insert(key.clone(), inner);
        ConfigValue::Object(map)
    })
}

/// Ensure `key_path` holds `value`, creating intermediate maps as needed.
pub fn ensure_value(
    doc: &Node,
    dialect: &dyn ConfigDialect,
    key_path: &KeyPath,
    value: &ConfigValue,
    strategy: MergeStrategy,
) -> Result<Ensured, StructuralError> {
    let cursor = match lookup(doc, dialect, key_path)? {
        Lookup::Missing { map, depth } => {
            let segments = key_path.segments();
            let nested = nest(value.clone(), &segments[depth + 1..]);
            let map = insert_entry(&map, dialect, &segments[depth], &nested)?;
            return Ok(Ensured::Changed(map.root()));
        }
        Lookup::Found(cursor) => cursor,
    };

    let existing = decode(&cursor, dialect, key_path)?;
    if existing == *value {
        return Ok(Ensured::Unchanged);
    }

    match strategy {
        MergeStrategy::Reject => Ok(Ensured::Conflict { existing }),
        MergeStrategy::PreferExisting => Ok(Ensured::Unchanged),
        MergeStrategy::PreferIncoming => {
            Ok(Ensured::Changed(replace_value(&cursor, dialect, value).root()))
        }
        MergeStrategy::MergeList => {
            let (Some(current), Some(incoming)) = (existing.as_array(), value.as_array()) else {
                return Ok(Ensured::Conflict {
                    existing: existing.clone(),
                });
            };
            let mut list = cursor.clone();
            let mut changed = false;
            for item in incoming.iter().filter(|item| !current.contains(item)) {
                list = append_item(&list, dialect, item)?;
                changed = true;
            }
            Ok(if changed {
                Ensured::Changed(list.root())
            } else {
                Ensured::Unchanged
            })
        }
    }
}

/// Append `value` to the list at `key_path` unless `dedupe` finds it.
/// Returns `None` when the list already holds it.
pub fn list_insert(
    doc: &Node,
    dialect: &dyn ConfigDialect,
    key_path: &KeyPath,
    value: &ConfigValue,
    dedupe: &DedupeBy,
) -> Result<Option<Node>, StructuralError> {
    match lookup(doc, dialect, key_path)? {
        Lookup::Missing { map, depth } => {
            let segments = key_path.segments();
            let nested = nest(
                ConfigValue::Array(vec![value.clone()]),
                &segments[depth + 1..],
            );
            let map = insert_entry(&map, dialect, &segments[depth], &nested)?;
            Ok(Some(map.root()))
        }
        Lookup::Found(list) => {
            if list.kind() != NodeKind::List {
                return Err(StructuralError::new(
                    list.path(),
                    format!("expected a list at '{key_path}', found a {}", list.kind()),
                ));
            }
            let items = decode(&list, dialect, key_path)?;
            let present = items
                .as_array()
                .is_some_and(|items| items.iter().any(|item| dedupe.matches(item, value)));
            if present {
                return Ok(None);
            }
            Ok(Some(append_item(&list, dialect, value)?.root()))
        }
    }
}

/// Replace the value under `cursor`, keeping its indentation.
pub fn replace_value(cursor: &Cursor, dialect: &dyn ConfigDialect, value: &ConfigValue) -> Cursor {
    let indent = line_indent(cursor);
    cursor.replace(dialect.encode_value(value, &indent))
}

/// Add `key: value` to the map under `map`. Returns a cursor on the map.
pub fn insert_entry(
    map: &Cursor,
    dialect: &dyn ConfigDialect,
    key: &str,
    value: &ConfigValue,
) -> Result<Cursor, StructuralError> {
    if map.kind() != NodeKind::Map {
        return Err(StructuralError::new(map.path(), "entries can only be added to a map"));
    }
    insert_item(map, dialect, |indent| dialect.encode_entry(key, value, indent))
}

/// Append `value` to the list under `list`. Returns a cursor on the list.
pub fn append_item(
    list: &Cursor,
    dialect: &dyn ConfigDialect,
    value: &ConfigValue,
) -> Result<Cursor, StructuralError> {
    if list.kind() != NodeKind::List {
        return Err(StructuralError::new(list.path(), "items can only be appended to a list"));
    }
    insert_item(list, dialect, |indent| dialect.encode_value(value, indent))
}

fn trivia(text: impl Into<String>) -> Node {
    Node::leaf(NodeKind::Trivia, text)
}

fn indent_after_newline(text: &str) -> String {
    text.rfind('\n')
        .map(|i| &text[i + 1..])
        .unwrap_or_default()
        .chars()
        .take_while(|c| matches!(c, ' ' | '\t'))
        .collect()
}

/// Indentation of the line the focus starts on.
pub fn line_indent(cursor: &Cursor) -> String {
    let mut current = cursor.clone();
    loop {
        let newline_before = current
            .prev_node()
            .filter(|prev| prev.kind() == NodeKind::Trivia && prev.text().contains('\n'));
        if let Some(prev) = newline_before {
            return indent_after_newline(prev.text());
        }
        match current.up() {
            Some(parent) if !parent.is_root() => current = parent,
            _ => return String::new(),
        }
    }
}

fn insert_item(
    container: &Cursor,
    dialect: &dyn ConfigDialect,
    make: impl FnOnce(&str) -> Node,
) -> Result<Cursor, StructuralError> {
    let node = container.focus().clone();
    if node.child(0).map(Node::kind) != Some(NodeKind::Punct) {
        return Err(StructuralError::new(
            container.path(),
            format!("{} has no opening bracket", node.kind()),
        ));
    }
    let base = line_indent(container);
    let items: Vec<usize> = node.significant_children().map(|(i, _)| i).collect();

    let (Some(&first), Some(&last)) = (items.first(), items.last()) else {
        return insert_first(container, dialect, &base, make);
    };

    let sample = last
        .checked_sub(1)
        .and_then(|i| node.child(i))
        .filter(|n| n.kind() == NodeKind::Trivia)
        .map(Node::text);
    let (gap, indent) = match sample {
        Some(t) if t.contains('\n') => {
            let indent = indent_after_newline(t);
            (format!("\n{indent}"), indent)
        }
        Some(t) if t.chars().all(char::is_whitespace) => (t.to_string(), base),
        Some(_) => (" ".to_string(), base),
        None if first != last => (String::new(), base),
        None => (" ".to_string(), base),
    };

    let separator = dialect.item_separator();
    let trailing = node
        .children()
        .iter()
        .enumerate()
        .skip(last + 1)
        .find(|(_, n)| n.kind() != NodeKind::Trivia)
        .filter(|(_, n)| n.kind() == NodeKind::Punct && n.text() == separator.text())
        .map(|(i, _)| i);

    let item = make(&indent);
    let cursor = match trailing {
        Some(comma) => container
            .down(comma)?
            .insert_after(trivia(gap))?
            .insert_after(item)?
            .insert_after(separator)?,
        None => container
            .down(last)?
            .insert_after(separator)?
            .insert_after(trivia(gap))?
            .insert_after(item)?,
    };
    cursor
        .up()
        .ok_or_else(|| StructuralError::new(container.path(), "container lost during insert"))
}

/// First item of an empty container. Maps open onto their own lines, lists
/// stay inline.
fn insert_first(
    container: &Cursor,
    dialect: &dyn ConfigDialect,
    base: &str,
    make: impl FnOnce(&str) -> Node,
) -> Result<Cursor, StructuralError> {
    let node = container.focus();
    let kept = node
        .children()
        .iter()
        .filter(|n| !(n.kind() == NodeKind::Trivia && n.text().trim().is_empty()))
        .cloned();
    let open = container
        .replace(Node::branch(node.kind(), kept))
        .down(0)?;

    let cursor = if node.kind() == NodeKind::Map {
        let inner = format!("{base}{}", dialect.indent_unit());
        open.insert_after(trivia(format!("\n{inner}")))?
            .insert_after(make(&inner))?
            .insert_after(trivia(format!("\n{base}")))?
    } else {
        open.insert_after(make(base))?
    };
    cursor
        .up()
        .ok_or_else(|| StructuralError::new(container.path(), "container lost during insert"))
}
