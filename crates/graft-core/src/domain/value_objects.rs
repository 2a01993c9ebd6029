//! Domain value objects: identifiers, key paths, merge strategies, flag types.
//!
//! # Design
//!
//! These are pure value types with equality-by-value and no identity. Every
//! type that can come from user input has a `FromStr` parser and a `Display`
//! that round-trips through it.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration values are JSON values regardless of the file dialect.
pub type ConfigValue = serde_json::Value;

pub(crate) fn validate_identifier(kind: &'static str, value: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| DomainError::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if value.contains('.') {
        return Err(invalid("cannot contain '.'"));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')))
    {
        return Err(invalid(&format!("unexpected character '{bad}'")));
    }
    Ok(())
}

// ── GeneratorId ──────────────────────────────────────────────────────────────

/// Unique name of a generator (also called a task), e.g. `config-append`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeneratorId(String);

impl GeneratorId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier("generator id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GeneratorId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GeneratorId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GeneratorId> for String {
    fn from(id: GeneratorId) -> Self {
        id.0
    }
}

// ── Group ────────────────────────────────────────────────────────────────────

/// Namespace label shared by related generators. Generators in the same group
/// share flags of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Group(String);

impl Group {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier("group", &value)?;
        Ok(Self(value))
    }

    /// The default group of a generator is its own id.
    pub fn of(id: &GeneratorId) -> Self {
        Self(id.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Group {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Group {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Group> for String {
    fn from(group: Group) -> Self {
        group.0
    }
}

// ── KeyPath ──────────────────────────────────────────────────────────────────

/// Path of keys into a configuration structure, e.g. `deps.serde.version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Build from explicit segments (segments may contain dots).
    pub fn new<I, S>(segments: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(DomainError::InvalidKeyPath(segments.join(".")));
        }
        Ok(Self(segments))
    }

    /// Parse a dotted path.
    pub fn parse(dotted: &str) -> Result<Self, DomainError> {
        Self::new(dotted.split('.'))
            .map_err(|_| DomainError::InvalidKeyPath(dotted.to_string()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── MergeStrategy ────────────────────────────────────────────────────────────

/// How `EnsureConfigValue` resolves an existing, different value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Record a `ValueConflict`.
    #[default]
    Reject,
    PreferExisting,
    PreferIncoming,
    /// Both values are lists: append incoming items that are not present.
    MergeList,
}

impl MergeStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::PreferExisting => "prefer-existing",
            Self::PreferIncoming => "prefer-incoming",
            Self::MergeList => "merge-list",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "prefer-existing" | "existing" => Ok(Self::PreferExisting),
            "prefer-incoming" | "incoming" => Ok(Self::PreferIncoming),
            "merge-list" | "merge" => Ok(Self::MergeList),
            _ => Err(DomainError::InvalidMergeStrategy(s.to_string())),
        }
    }
}

// ── DedupeBy ─────────────────────────────────────────────────────────────────

/// Predicate deciding whether a list already holds an incoming element.
///
/// Kept as data (not a closure) so operations stay inspectable and comparable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupeBy {
    #[default]
    Equal,
    /// Object items are equal when this field is equal.
    Field(String),
}

impl DedupeBy {
    pub fn matches(&self, existing: &ConfigValue, incoming: &ConfigValue) -> bool {
        match self {
            Self::Equal => existing == incoming,
            Self::Field(field) => match (existing.get(field), incoming.get(field)) {
                (Some(a), Some(b)) => a == b,
                _ => existing == incoming,
            },
        }
    }
}

impl fmt::Display for DedupeBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => f.write_str("equal"),
            Self::Field(field) => write!(f, "field:{field}"),
        }
    }
}

impl FromStr for DedupeBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("equal") => Ok(Self::Equal),
            Some(("field", name)) if !name.is_empty() => Ok(Self::Field(name.to_string())),
            _ => Err(DomainError::InvalidDedupe(s.to_string())),
        }
    }
}

// ── FlagType ─────────────────────────────────────────────────────────────────

/// Declared type of a generator flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Boolean,
    String,
    Integer,
    /// Repeatable; every occurrence appends.
    List,
}

impl FlagType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Integer => "integer",
            Self::List => "list",
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(Self::Boolean),
            "string" | "str" => Ok(Self::String),
            "integer" | "int" => Ok(Self::Integer),
            "list" | "array" => Ok(Self::List),
            other => Err(DomainError::InvalidIdentifier {
                kind: "flag type",
                value: other.to_string(),
                reason: "expected boolean, string, integer or list".into(),
            }),
        }
    }
}

/// A bound flag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    List(Vec<String>),
}

impl FlagValue {
    pub const fn flag_type(&self) -> FlagType {
        match self {
            Self::Boolean(_) => FlagType::Boolean,
            Self::Integer(_) => FlagType::Integer,
            Self::String(_) => FlagType::String,
            Self::List(_) => FlagType::List,
        }
    }

    /// Text form used for placeholder substitution.
    pub fn render(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::String(s) => s.clone(),
            Self::List(items) => items.join(","),
        }
    }
}
