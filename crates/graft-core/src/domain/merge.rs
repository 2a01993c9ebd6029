//! Merging patch operations into one change set.
//!
//! Operations are applied in the order they are fed in. Each one sees the
//! result of every earlier one. An operation that conflicts or whose target is
//! malformed is recorded and skipped; the rest of the run still merges, so a
//! single report lists every problem at once.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use im::OrdMap;
use rayon::prelude::*;
use uuid::Uuid;

use crate::domain::entities::changeset::{
    AlreadyExistsConflict, Conflict, ConflictReport, FileChange, MergedChangeSet, Owner,
    RawEditConflict, StructuralFailure, ValueConflict,
};
use crate::domain::entities::common::RelativePath;
use crate::domain::entities::patch::{FileContent, PatchKind, PatchOperation, Provenance};
use crate::domain::entities::render::RenderContext;
use crate::domain::entities::snapshot::{ProjectSnapshot, ProjectView};
use crate::domain::error::DomainError;
use crate::domain::syntax::config::{self, Ensured};
use crate::domain::syntax::{ConfigDialect, Cursor, Node, NodeKind, NodePath, Syntax, SyntaxSet};
use crate::domain::value_objects::{ConfigValue, DedupeBy, KeyPath, MergeStrategy};

enum Rejected {
    Conflict(Conflict),
    Failure(DomainError),
}

impl From<DomainError> for Rejected {
    fn from(err: DomainError) -> Self {
        Self::Failure(err)
    }
}

/// `Ok(true)` when the operation changed its file, `Ok(false)` for a no-op.
type Applied = Result<bool, Rejected>;

/// Bytes a raw edit claimed, kept in terms of the file's current text.
struct RawRegion {
    path: RelativePath,
    span: Range<usize>,
    target: NodePath,
    owner: Provenance,
}

impl RawRegion {
    /// Move the region through a text change from `before` to `after`.
    /// A region the change touches grows to cover the changed bytes.
    fn rebase(&mut self, before: &str, after: &str) {
        let prefix = before
            .bytes()
            .zip(after.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = before.len().min(after.len()) - prefix;
        let suffix = before
            .bytes()
            .rev()
            .zip(after.bytes().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        let old_end = before.len() - suffix;
        let new_end = after.len() - suffix;

        if self.span.start >= old_end {
            self.span = self.span.start - old_end + new_end..self.span.end - old_end + new_end;
            return;
        }
        if self.span.end <= prefix {
            return;
        }
        let start = self.span.start.min(prefix);
        let end = if self.span.end > old_end {
            self.span.end - old_end + new_end
        } else {
            new_end
        };
        self.span = start..end;
    }

    fn overlaps(&self, span: &Range<usize>) -> bool {
        self.span.start == span.start
            || (self.span.start < span.end && span.start < self.span.end)
    }
}

/// Working state of one run.
pub struct Merger<'a> {
    snapshot: &'a ProjectSnapshot,
    syntaxes: &'a SyntaxSet,
    context: RenderContext,
    overlay: OrdMap<RelativePath, Arc<str>>,
    /// Parse of the current text of a file, dropped whenever the text changes.
    trees: HashMap<RelativePath, Node>,
    applied: BTreeMap<RelativePath, Vec<PatchOperation>>,
    created_by: HashMap<RelativePath, Provenance>,
    value_owners: HashMap<(RelativePath, KeyPath), Provenance>,
    raw_regions: Vec<RawRegion>,
    report: ConflictReport,
}

impl<'a> Merger<'a> {
    pub fn new(snapshot: &'a ProjectSnapshot, syntaxes: &'a SyntaxSet, context: RenderContext) -> Self {
        Self {
            snapshot,
            syntaxes,
            context,
            overlay: OrdMap::new(),
            trees: HashMap::new(),
            applied: BTreeMap::new(),
            created_by: HashMap::new(),
            value_owners: HashMap::new(),
            raw_regions: Vec::new(),
            report: ConflictReport::default(),
        }
    }

    /// The project as the next generator should see it.
    pub fn view(&self) -> ProjectView<'_> {
        ProjectView::new(self.snapshot, &self.overlay, self.syntaxes)
    }

    pub fn report(&self) -> &ConflictReport {
        &self.report
    }

    /// Record a failure that happened outside an operation, e.g. a generator
    /// that could not read its input.
    pub fn record_failure(&mut self, provenance: Provenance, err: DomainError) {
        self.report.failures.push(failure(provenance, err));
    }

    /// Apply a batch in order. Files the batch edits structurally are parsed
    /// up front, in parallel.
    pub fn apply_all(&mut self, operations: Vec<PatchOperation>) {
        self.prepare(&operations);
        for operation in operations {
            self.apply(operation);
        }
    }

    fn prepare(&mut self, operations: &[PatchOperation]) {
        let mut pending: HashMap<&RelativePath, (Arc<str>, Arc<dyn Syntax>)> = HashMap::new();
        for op in operations.iter().filter(|op| op.kind().needs_tree()) {
            let path = op.path();
            if self.trees.contains_key(path) || pending.contains_key(path) {
                continue;
            }
            if let Some(text) = self.current_text(path) {
                pending.insert(path, (text, self.syntaxes.for_path(path.as_path())));
            }
        }
        if pending.len() < 2 {
            return;
        }

        let parsed: Vec<(RelativePath, Node)> = pending
            .into_par_iter()
            .filter_map(|(path, (text, syntax))| {
                syntax.parse(&text).ok().map(|tree| (path.clone(), tree))
            })
            .collect();
        self.trees.extend(parsed);
    }

    pub fn apply(&mut self, operation: PatchOperation) {
        let provenance = operation.provenance().clone();
        let outcome = match operation.kind() {
            PatchKind::CreateFile { path, content } => self.create_file(path, content, &provenance),
            PatchKind::EnsureConfigValue {
                path,
                key_path,
                value,
                strategy,
            } => self.ensure_value(path, key_path, value, *strategy, &provenance),
            PatchKind::ListInsert {
                path,
                key_path,
                value,
                dedupe,
            } => self.list_insert(path, key_path, value, dedupe, &provenance),
            PatchKind::RawEdit {
                path,
                target,
                replacement,
            } => self.raw_edit(path, target, replacement, &provenance),
        };

        match outcome {
            Ok(true) => self
                .applied
                .entry(operation.path().clone())
                .or_default()
                .push(operation),
            Ok(false) => {}
            Err(Rejected::Conflict(conflict)) => self.report.push(conflict),
            Err(Rejected::Failure(err)) => self.record_failure(provenance, err),
        }
    }

    /// Close the run. Files whose final text equals their original text are
    /// left out.
    pub fn finish(self, run_id: Uuid) -> MergedChangeSet {
        let mut change_set = MergedChangeSet::new(run_id);
        for (path, operations) in self.applied {
            let Some(after) = self.overlay.get(&path) else {
                continue;
            };
            let before = self.snapshot.read(&path);
            if before.is_some_and(|b| **b == **after) {
                continue;
            }
            change_set.files.insert(
                path.clone(),
                FileChange {
                    path,
                    before: before.map(|b| b.to_string()),
                    after: after.to_string(),
                    operations,
                },
            );
        }
        change_set.report = self.report;
        change_set
    }

    // ── File state ──────────────────────────────────────────────────────────

    fn current_text(&self, path: &RelativePath) -> Option<Arc<str>> {
        self.overlay
            .get(path)
            .or_else(|| self.snapshot.read(path))
            .cloned()
    }

    fn set_text(&mut self, path: &RelativePath, text: String) {
        if let Some(before) = self.current_text(path) {
            for region in self.raw_regions.iter_mut().filter(|r| &r.path == path) {
                region.rebase(&before, &text);
            }
        }
        self.overlay.insert(path.clone(), Arc::from(text));
        self.trees.remove(path);
    }

    /// Record `by` as the creator of `path` when it does not exist yet.
    fn claim_if_new(&mut self, path: &RelativePath, by: &Provenance) {
        if self.current_text(path).is_none() {
            self.created_by.insert(path.clone(), by.clone());
        }
    }

    fn tree(&mut self, path: &RelativePath, syntax: &dyn Syntax) -> Result<Option<Node>, DomainError> {
        if let Some(tree) = self.trees.get(path) {
            return Ok(Some(tree.clone()));
        }
        let Some(text) = self.current_text(path) else {
            return Ok(None);
        };
        let tree = syntax.parse(&text).map_err(|e| e.in_file(path))?;
        self.trees.insert(path.clone(), tree.clone());
        Ok(Some(tree))
    }

    // ── Operations ──────────────────────────────────────────────────────────

    fn create_file(&mut self, path: &RelativePath, content: &FileContent, by: &Provenance) -> Applied {
        let rendered = content.render(&self.context);
        match self.current_text(path) {
            None => {
                self.set_text(path, rendered);
                self.created_by.insert(path.clone(), by.clone());
                Ok(true)
            }
            Some(existing) if *existing == *rendered => Ok(false),
            Some(_) => {
                let holder = self
                    .created_by
                    .get(path)
                    .map_or(Owner::Project, |p| p.clone().into());
                Err(Rejected::Conflict(Conflict::AlreadyExists(
                    AlreadyExistsConflict {
                        path: path.clone(),
                        claimants: vec![holder, by.clone().into()],
                    },
                )))
            }
        }
    }

    /// Config tree of `path`, or a fresh empty document when it is missing.
    fn config_tree(
        &mut self,
        path: &RelativePath,
        syntax: &dyn Syntax,
        dialect: &dyn ConfigDialect,
    ) -> Result<Node, DomainError> {
        match self.tree(path, syntax)? {
            Some(tree) => Ok(tree),
            None => syntax
                .parse(dialect.empty_document())
                .map_err(|e| e.in_file(path)),
        }
    }

    fn dialect_error(path: &RelativePath, syntax: &dyn Syntax) -> DomainError {
        DomainError::structural(
            path.to_string(),
            format!("{} files have no configuration keys", syntax.name()),
        )
    }

    fn ensure_value(
        &mut self,
        path: &RelativePath,
        key_path: &KeyPath,
        value: &ConfigValue,
        strategy: MergeStrategy,
        by: &Provenance,
    ) -> Applied {
        let syntax = self.syntaxes.for_path(path.as_path());
        let dialect = syntax
            .config()
            .ok_or_else(|| Self::dialect_error(path, syntax.as_ref()))?;
        let doc = self.config_tree(path, syntax.as_ref(), dialect)?;

        match config::ensure_value(&doc, dialect, key_path, value, strategy)
            .map_err(|e| e.in_file(path))?
        {
            Ensured::Changed(tree) => {
                self.claim_if_new(path, by);
                self.set_text(path, syntax.render(&tree));
                self.value_owners
                    .insert((path.clone(), key_path.clone()), by.clone());
                Ok(true)
            }
            Ensured::Unchanged => Ok(false),
            Ensured::Conflict { existing } => {
                let existing_owner = self
                    .value_owners
                    .get(&(path.clone(), key_path.clone()))
                    .map_or(Owner::Project, |p| p.clone().into());
                Err(Rejected::Conflict(Conflict::Value(ValueConflict {
                    path: path.clone(),
                    key_path: key_path.clone(),
                    existing,
                    existing_owner,
                    incoming: value.clone(),
                    incoming_owner: by.clone(),
                })))
            }
        }
    }

    fn list_insert(
        &mut self,
        path: &RelativePath,
        key_path: &KeyPath,
        value: &ConfigValue,
        dedupe: &DedupeBy,
        by: &Provenance,
    ) -> Applied {
        let syntax = self.syntaxes.for_path(path.as_path());
        let dialect = syntax
            .config()
            .ok_or_else(|| Self::dialect_error(path, syntax.as_ref()))?;
        let doc = self.config_tree(path, syntax.as_ref(), dialect)?;

        match config::list_insert(&doc, dialect, key_path, value, dedupe)
            .map_err(|e| e.in_file(path))?
        {
            Some(tree) => {
                self.claim_if_new(path, by);
                self.set_text(path, syntax.render(&tree));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn raw_edit(
        &mut self,
        path: &RelativePath,
        target: &NodePath,
        replacement: &str,
        by: &Provenance,
    ) -> Applied {
        let syntax = self.syntaxes.for_path(path.as_path());
        let tree = self.tree(path, syntax.as_ref())?.ok_or_else(|| {
            DomainError::structural(path.to_string(), "raw edit targets a file that does not exist")
        })?;
        let cursor = Cursor::at(&tree, target).map_err(|e| e.in_file(path))?;
        let span = cursor.span();

        if let Some(region) = self
            .raw_regions
            .iter()
            .find(|r| &r.path == path && r.overlaps(&span))
        {
            return Err(Rejected::Conflict(Conflict::RawEdit(RawEditConflict {
                path: path.clone(),
                first: region.owner.clone(),
                first_target: region.target.clone(),
                second: by.clone(),
                second_target: target.clone(),
            })));
        }

        let claimed = span.start..span.start + replacement.len();
        let changed = cursor.focus().to_source() != replacement;
        if changed {
            let edited = cursor.replace(Node::leaf(NodeKind::Raw, replacement)).root();
            self.set_text(path, syntax.render(&edited));
        }
        self.raw_regions.push(RawRegion {
            path: path.clone(),
            span: claimed,
            target: target.clone(),
            owner: by.clone(),
        });
        Ok(changed)
    }
}

fn failure(generator: Provenance, err: DomainError) -> StructuralFailure {
    match err {
        DomainError::Structural {
            path,
            location,
            reason,
        } => StructuralFailure {
            path,
            location,
            generator,
            reason,
        },
        DomainError::Syntax {
            path,
            line,
            column,
            message,
        } => StructuralFailure {
            path,
            location: format!("{line}:{column}"),
            generator,
            reason: message,
        },
        other => StructuralFailure {
            path: String::new(),
            location: "<run>".into(),
            generator,
            reason: other.to_string(),
        },
    }
}
