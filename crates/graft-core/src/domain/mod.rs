//! Core domain layer for Graft.
//!
//! This module contains pure logic: syntax trees and the zipper over them,
//! the patch model, generator composition, flag resolution, merging and
//! diffing. All I/O is handled via ports defined in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or external calls
//! - **Persistent data**: trees and snapshots share structure (`im`)
//! - **Immutable entities**: edits produce new values
//!
// Public API - what the world sees
pub mod diff;
pub mod entities;
pub mod error;
pub mod merge;
pub mod syntax;
pub mod value_objects;

mod validation;

// Re-exports for convenience
pub use entities::{
    AcceptedFlag, AlreadyExistsConflict, AmbiguousFlagReport, BoundArgs, CompositionCycleError,
    Conflict, ConflictReport, FileChange, FileContent, FlagAmbiguity, FlagNamespace, FlagSpec,
    FlagTarget, Generator, GeneratorArgs, GeneratorDescriptor, GeneratorRequest, Invocation,
    MergedChangeSet, Owner, PatchKind, PatchOperation, ProjectSnapshot, ProjectView, Provenance,
    RawEditConflict, RelativePath, RenderContext, StructuralFailure, ValueConflict,
};

pub use diff::{DiffStatus, FileDiff};
pub use error::{DomainError, ErrorCategory};
pub use merge::Merger;
pub use syntax::{
    ConfigDialect, Cursor, JsonSyntax, Node, NodeKind, NodePath, StructuralError, Syntax,
    SyntaxError, SyntaxSet, TextSyntax,
};
pub use value_objects::{
    ConfigValue, DedupeBy, FlagType, FlagValue, GeneratorId, Group, KeyPath, MergeStrategy,
};

pub use validation::DomainValidator;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn path(p: &str) -> RelativePath {
        RelativePath::try_new(p).unwrap()
    }

    fn prov(name: &str) -> Provenance {
        let id = GeneratorId::new(name).unwrap();
        Provenance::new(id.clone(), Group::of(&id))
    }

    // ========================================================================
    // Scenario: three generators touching one project
    // ========================================================================

    #[test]
    fn composed_run_merges_and_conflicts_together() {
        let snapshot = ProjectSnapshot::new("/work/demo", "demo").with_file(
            path("config/config.json"),
            "{\n  \"plugins\": [\n    \"Bar\",\n  ]\n}\n",
        );
        let syntaxes = SyntaxSet::builtin();
        let mut merger = Merger::new(&snapshot, &syntaxes, RenderContext::new("demo"));

        merger.apply_all(vec![PatchOperation::new(
            PatchKind::create_file(path("lib/foo.ex"), FileContent::literal("defmodule Foo do\nend\n")),
            prov("gen1"),
        )]);
        merger.apply_all(vec![
            PatchOperation::new(
                PatchKind::create_file(path("lib/foo.ex"), FileContent::literal("defmodule Foo.Other do\nend\n")),
                prov("gen2"),
            ),
            PatchOperation::new(
                PatchKind::list_insert(path("config/config.json"), KeyPath::parse("plugins").unwrap(), json!("Foo")),
                prov("gen2"),
            ),
        ]);
        let cs = merger.finish(uuid::Uuid::nil());

        assert_eq!(cs.report.conflicts.len(), 1);
        let diff = FileDiff::of(cs.file(&path("config/config.json")).unwrap(), 3);
        assert_eq!((diff.insertions, diff.deletions), (1, 0));
        assert!(diff.unified.contains("+    \"Foo\",\n"));
    }

    // ========================================================================
    // Properties
    // ========================================================================

    fn json_value() -> impl Strategy<Value = ConfigValue> {
        let leaf = prop_oneof![
            Just(ConfigValue::Null),
            any::<bool>().prop_map(ConfigValue::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z ]{0,8}".prop_map(ConfigValue::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(ConfigValue::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| ConfigValue::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn json_render_reproduces_pretty_and_compact_source(value in json_value()) {
            for source in [
                serde_json::to_string_pretty(&value).unwrap(),
                serde_json::to_string(&value).unwrap(),
            ] {
                let tree = JsonSyntax.parse(&source).unwrap();
                prop_assert_eq!(JsonSyntax.render(&tree), source);
            }
        }

        #[test]
        fn ensured_value_reads_back_and_keeps_siblings(
            value in json_value(),
            key in "[a-z]{1,6}",
        ) {
            let source = "{\n  // keep me\n  \"zzz_sibling\": [1, 2],\n}\n";
            let doc = JsonSyntax.parse(source).unwrap();
            let key_path = KeyPath::parse(&format!("new.{key}")).unwrap();
            let syntax::config::Ensured::Changed(tree) = syntax::config::ensure_value(
                &doc, &JsonSyntax, &key_path, &value, MergeStrategy::Reject,
            ).unwrap() else {
                return Err(TestCaseError::fail("expected a change"));
            };

            let rendered = JsonSyntax.render(&tree);
            let kept_prefix = rendered.starts_with("{\n  // keep me\n  \"zzz_sibling\": [1, 2],\n");
            prop_assert!(kept_prefix, "siblings rewritten: {:?}", rendered);
            let reparsed = JsonSyntax.parse(&rendered).unwrap();
            prop_assert_eq!(
                syntax::config::read(&reparsed, &JsonSyntax, &key_path).unwrap(),
                Some(value)
            );
        }

        #[test]
        fn text_raw_edit_touches_only_its_line(
            lines in prop::collection::vec("[a-z]{0,5}", 1..12),
            pick in any::<prop::sample::Index>(),
        ) {
            let source: String = lines.iter().map(|l| format!("{l}\n")).collect();
            let tree = TextSyntax.parse(&source).unwrap();
            let target = pick.index(lines.len());
            let edited = Cursor::at(&tree, &NodePath::new(vec![target]))
                .unwrap()
                .replace(Node::leaf(NodeKind::Raw, "EDITED\n"))
                .root();

            let out = TextSyntax.render(&edited);
            for (i, line) in out.lines().enumerate() {
                if i == target {
                    prop_assert_eq!(line, "EDITED");
                } else {
                    prop_assert_eq!(line, lines[i].as_str());
                }
            }
            // untouched lines are shared, not copied
            for i in (0..lines.len()).filter(|&i| i != target) {
                prop_assert!(tree.child(i).unwrap().ptr_eq(edited.child(i).unwrap()));
            }
        }
    }
}
