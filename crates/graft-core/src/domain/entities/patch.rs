//! Patch operations: the only way a generator can ask for a change.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::RelativePath;
use super::render::RenderContext;
use crate::domain::syntax::NodePath;
use crate::domain::value_objects::{ConfigValue, DedupeBy, GeneratorId, Group, KeyPath, MergeStrategy};

/// Which generator produced an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Provenance {
    pub generator: GeneratorId,
    pub group: Group,
}

impl Provenance {
    pub fn new(generator: GeneratorId, group: Group) -> Self {
        Self { generator, group }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.as_str() == self.generator.as_str() {
            write!(f, "`{}`", self.generator)
        } else {
            write!(f, "`{}` (group `{}`)", self.generator, self.group)
        }
    }
}

/// Body of a created file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FileContent {
    Literal { text: String },
    /// `{{VARIABLE}}` text rendered against the run's context plus `variables`.
    Template {
        source: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        variables: BTreeMap<String, String>,
    },
}

impl FileContent {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal { text: text.into() }
    }

    pub fn template(source: impl Into<String>) -> Self {
        Self::Template {
            source: source.into(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Template { variables, .. } = &mut self {
            variables.insert(key.into(), value.into());
        }
        self
    }

    pub fn render(&self, context: &RenderContext) -> String {
        match self {
            Self::Literal { text } => text.clone(),
            Self::Template { source, variables } => context.extended(variables).render(source),
        }
    }
}

/// What a patch operation does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum PatchKind {
    /// Create a file that must not exist yet (identical content is a no-op).
    CreateFile {
        path: RelativePath,
        content: FileContent,
    },
    /// Ensure a configuration key holds a value.
    EnsureConfigValue {
        path: RelativePath,
        key_path: KeyPath,
        value: ConfigValue,
        #[serde(default)]
        strategy: MergeStrategy,
    },
    /// Append to a configuration list unless already present.
    ListInsert {
        path: RelativePath,
        key_path: KeyPath,
        value: ConfigValue,
        #[serde(default)]
        dedupe: DedupeBy,
    },
    /// Replace the text of one syntax node.
    RawEdit {
        path: RelativePath,
        target: NodePath,
        replacement: String,
    },
}

impl PatchKind {
    pub fn create_file(path: RelativePath, content: FileContent) -> Self {
        Self::CreateFile { path, content }
    }

    pub fn ensure_value(path: RelativePath, key_path: KeyPath, value: ConfigValue) -> Self {
        Self::EnsureConfigValue {
            path,
            key_path,
            value,
            strategy: MergeStrategy::default(),
        }
    }

    pub fn list_insert(path: RelativePath, key_path: KeyPath, value: ConfigValue) -> Self {
        Self::ListInsert {
            path,
            key_path,
            value,
            dedupe: DedupeBy::default(),
        }
    }

    pub fn raw_edit(path: RelativePath, target: NodePath, replacement: impl Into<String>) -> Self {
        Self::RawEdit {
            path,
            target,
            replacement: replacement.into(),
        }
    }

    /// Set the merge strategy of an `EnsureConfigValue`; other kinds are
    /// returned unchanged.
    pub fn with_strategy(mut self, merge: MergeStrategy) -> Self {
        if let Self::EnsureConfigValue { strategy, .. } = &mut self {
            *strategy = merge;
        }
        self
    }

    pub fn with_dedupe(mut self, by: DedupeBy) -> Self {
        if let Self::ListInsert { dedupe, .. } = &mut self {
            *dedupe = by;
        }
        self
    }

    pub fn path(&self) -> &RelativePath {
        match self {
            Self::CreateFile { path, .. }
            | Self::EnsureConfigValue { path, .. }
            | Self::ListInsert { path, .. }
            | Self::RawEdit { path, .. } => path,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateFile { .. } => "create-file",
            Self::EnsureConfigValue { .. } => "ensure-config-value",
            Self::ListInsert { .. } => "list-insert",
            Self::RawEdit { .. } => "raw-edit",
        }
    }

    /// Whether applying this operation needs the file's syntax tree.
    pub const fn needs_tree(&self) -> bool {
        !matches!(self, Self::CreateFile { .. })
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFile { path, .. } => write!(f, "create {path}"),
            Self::EnsureConfigValue { path, key_path, value, .. } => {
                write!(f, "set {path}:{key_path} = {value}")
            }
            Self::ListInsert { path, key_path, value, .. } => {
                write!(f, "append {value} to {path}:{key_path}")
            }
            Self::RawEdit { path, target, .. } => write!(f, "edit {path} at {target}"),
        }
    }
}

/// A patch kind stamped with the generator that asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    #[serde(flatten)]
    kind: PatchKind,
    provenance: Provenance,
}

impl PatchOperation {
    pub fn new(kind: PatchKind, provenance: Provenance) -> Self {
        Self { kind, provenance }
    }

    pub fn kind(&self) -> &PatchKind {
        &self.kind
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn path(&self) -> &RelativePath {
        self.kind.path()
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (by {})", self.kind, self.provenance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> RelativePath {
        RelativePath::try_new(p).unwrap()
    }

    #[test]
    fn template_content_renders_with_local_variables() {
        let content = FileContent::template("# {{PROJECT_NAME}} by {{AUTHOR}}").with_variable("AUTHOR", "ada");
        assert_eq!(content.render(&RenderContext::new("demo")), "# demo by ada");
        assert_eq!(FileContent::literal("{{X}}").render(&RenderContext::default()), "{{X}}");
    }

    #[test]
    fn builders_only_touch_matching_kinds() {
        let op = PatchKind::ensure_value(path("a.json"), KeyPath::parse("x").unwrap(), json!(1))
            .with_strategy(MergeStrategy::PreferIncoming)
            .with_dedupe(DedupeBy::Field("name".into()));
        assert!(matches!(
            op,
            PatchKind::EnsureConfigValue {
                strategy: MergeStrategy::PreferIncoming,
                ..
            }
        ));
    }

    #[test]
    fn operation_serializes_with_provenance() {
        let op = PatchOperation::new(
            PatchKind::list_insert(path("cfg.json"), KeyPath::parse("plugins").unwrap(), json!("Foo")),
            Provenance::new(GeneratorId::new("gen2").unwrap(), Group::new("config").unwrap()),
        );
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op"], "list-insert");
        assert_eq!(value["path"], "cfg.json");
        assert_eq!(value["provenance"]["generator"], "gen2");
        assert_eq!(op.to_string(), "append \"Foo\" to cfg.json:plugins (by `gen2` (group `config`))");
    }
}
