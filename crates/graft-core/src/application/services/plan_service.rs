//! Plan Service - turns generator requests into a merged change set.
//!
//! The workflow:
//! 1. Expand the requested generators through their compositions
//! 2. Resolve one flag namespace over every participant and bind arguments
//! 3. Run each generator against the evolving project view and merge its
//!    operations
//!
//! Nothing is written; see [`ApplyService`](super::ApplyService).

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::ports::{GeneratorRegistry, ProjectLoader},
    domain::{
        BoundArgs, DomainError, DomainValidator as validator, FlagNamespace, GeneratorId,
        GeneratorRequest, Invocation, MergedChangeSet, Merger, PatchOperation, ProjectSnapshot,
        Provenance, RenderContext, SyntaxSet, entities::composition,
    },
    error::{GraftError, GraftResult},
};

/// Planning service.
///
/// Holds no per-run state; one instance can plan any number of runs.
pub struct PlanService {
    registry: Arc<dyn GeneratorRegistry>,
    loader: Arc<dyn ProjectLoader>,
    syntaxes: SyntaxSet,
    variables: BTreeMap<String, String>,
}

impl PlanService {
    /// Create a plan service over the built-in syntaxes.
    pub fn new(registry: Arc<dyn GeneratorRegistry>, loader: Arc<dyn ProjectLoader>) -> Self {
        Self {
            registry,
            loader,
            syntaxes: SyntaxSet::builtin(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_syntaxes(mut self, syntaxes: SyntaxSet) -> Self {
        self.syntaxes = syntaxes;
        self
    }

    /// Template variable available to every `FileContent::Template` of a run.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn syntaxes(&self) -> &SyntaxSet {
        &self.syntaxes
    }

    /// Plan a run against the project as the loader currently sees it.
    ///
    /// Any conflict or structural failure fails the whole plan with the full
    /// report.
    pub fn plan(&self, requests: &[GeneratorRequest]) -> GraftResult<MergedChangeSet> {
        let snapshot = self.loader.load()?;
        self.plan_snapshot(&snapshot, requests)
    }

    /// [`plan`](Self::plan) against a given snapshot.
    pub fn plan_snapshot(
        &self,
        snapshot: &ProjectSnapshot,
        requests: &[GeneratorRequest],
    ) -> GraftResult<MergedChangeSet> {
        let change_set = self.merge(snapshot, requests)?;
        if change_set.has_conflicts() {
            warn!(
                conflicts = change_set.report.conflicts.len(),
                failures = change_set.report.failures.len(),
                "Plan rejected"
            );
            return Err(DomainError::Conflicts(change_set.report).into());
        }
        Ok(change_set)
    }

    /// Merge a run and return the change set together with its report, even
    /// when the report is not empty.
    ///
    /// Fails outright only for problems that stop the run from starting:
    /// unknown generators, composition cycles, unusable arguments, or a
    /// generator that gave up.
    #[instrument(
        skip_all,
        fields(
            project = %snapshot.name(),
            requests = requests.len()
        )
    )]
    pub fn merge(
        &self,
        snapshot: &ProjectSnapshot,
        requests: &[GeneratorRequest],
    ) -> GraftResult<MergedChangeSet> {
        let invocations = self.expand(requests)?;
        info!(invocations = invocations.len(), "Composition expanded");

        let namespace = Self::namespace(&invocations);
        let bound = requests
            .iter()
            .map(|request| namespace.bind(&request.args))
            .collect::<Result<Vec<BoundArgs>, _>>()?;

        let context = RenderContext::new(snapshot.name()).extended(self.variables.iter());
        let mut merger = Merger::new(snapshot, &self.syntaxes, context);

        for invocation in &invocations {
            let generator = &invocation.generator;
            let descriptor = generator.descriptor();
            let provenance = Provenance::new(descriptor.id.clone(), descriptor.group.clone());
            let args = namespace.args_for(&bound[invocation.request], &descriptor.id);

            let kinds = match generator.run(&merger.view(), &args) {
                Ok(kinds) => kinds,
                Err(err @ (DomainError::Structural { .. } | DomainError::Syntax { .. })) => {
                    warn!(generator = %descriptor.id, error = %err, "Generator could not read its input");
                    merger.record_failure(provenance, err);
                    continue;
                }
                Err(err) => {
                    warn!(generator = %descriptor.id, error = %err, "Generator failed");
                    return Err(err.into());
                }
            };
            debug!(generator = %descriptor.id, operations = kinds.len(), "Generator ran");

            let mut operations = Vec::with_capacity(kinds.len());
            for kind in kinds {
                match validator::validate_patch(&kind) {
                    Ok(()) => operations.push(PatchOperation::new(kind, provenance.clone())),
                    Err(err) => merger.record_failure(provenance.clone(), err),
                }
            }
            merger.apply_all(operations);
        }

        let change_set = merger.finish(Uuid::new_v4());
        info!(
            run_id = %change_set.run_id,
            files = change_set.files.len(),
            problems = change_set.report.len(),
            "Run merged"
        );
        Ok(change_set)
    }

    /// Flag namespace of the given generators and everything they compose.
    ///
    /// Returns the ambiguity report as an error when any flag name is
    /// ambiguous, whether or not it would be used.
    pub fn resolve_flags(&self, ids: &[GeneratorId]) -> GraftResult<FlagNamespace> {
        let requests: Vec<_> = ids.iter().cloned().map(GeneratorRequest::bare).collect();
        let invocations = self.expand(&requests)?;
        Ok(Self::namespace(&invocations).into_result()?)
    }

    fn expand(&self, requests: &[GeneratorRequest]) -> GraftResult<Vec<Invocation>> {
        composition::expand::<_, GraftError>(requests, |id| self.registry.lookup(id))
    }

    fn namespace(invocations: &[Invocation]) -> FlagNamespace {
        FlagNamespace::resolve(invocations.iter().map(|i| i.generator.descriptor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationError;
    use crate::application::ports::{MockGeneratorRegistry, MockProjectLoader};
    use crate::domain::{
        FileContent, FlagSpec, Generator, GeneratorArgs, GeneratorDescriptor, Group, KeyPath,
        PatchKind, ProjectView, RelativePath,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type RunFn = dyn Fn(&ProjectView<'_>, &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError>
        + Send
        + Sync;

    struct FnGenerator {
        descriptor: GeneratorDescriptor,
        run: Box<RunFn>,
        calls: AtomicUsize,
    }

    impl Generator for FnGenerator {
        fn descriptor(&self) -> &GeneratorDescriptor {
            &self.descriptor
        }

        fn run(&self, view: &ProjectView<'_>, args: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.run)(view, args)
        }
    }

    fn generator<F>(descriptor: GeneratorDescriptor, run: F) -> Arc<FnGenerator>
    where
        F: Fn(&ProjectView<'_>, &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(FnGenerator {
            descriptor,
            run: Box::new(run),
            calls: AtomicUsize::new(0),
        })
    }

    fn id(s: &str) -> GeneratorId {
        GeneratorId::new(s).unwrap()
    }

    fn path(p: &str) -> RelativePath {
        RelativePath::try_new(p).unwrap()
    }

    fn registry(generators: Vec<Arc<FnGenerator>>) -> Arc<MockGeneratorRegistry> {
        let by_id: HashMap<GeneratorId, Arc<dyn Generator>> = generators
            .into_iter()
            .map(|g| (g.descriptor.id.clone(), g as Arc<dyn Generator>))
            .collect();
        let mut registry = MockGeneratorRegistry::new();
        registry.expect_lookup().returning(move |gid| {
            by_id.get(gid).cloned().ok_or_else(|| {
                ApplicationError::UnknownGenerator {
                    id: gid.clone(),
                    available: Vec::new(),
                }
                .into()
            })
        });
        Arc::new(registry)
    }

    fn service(generators: Vec<Arc<FnGenerator>>, snapshot: ProjectSnapshot) -> PlanService {
        let mut loader = MockProjectLoader::new();
        loader.expect_load().returning(move || Ok(snapshot.clone()));
        PlanService::new(registry(generators), Arc::new(loader))
    }

    fn config_snapshot() -> ProjectSnapshot {
        ProjectSnapshot::new("/work/app", "app").with_file(
            path("config/config.json"),
            "{\n  \"things\": [\n    \"Bar\"\n  ]\n}\n",
        )
    }

    #[test]
    fn composed_generator_sees_parent_output() {
        let gen1 = generator(
            GeneratorDescriptor::new(id("gen1")).composes(id("gen2")),
            |_, _| {
                Ok(vec![PatchKind::create_file(
                    path("lib/foo.ex"),
                    FileContent::template("defmodule {{PROJECT_NAME_PASCAL}}.Foo do\nend\n"),
                )])
            },
        );
        let gen2 = generator(GeneratorDescriptor::new(id("gen2")), |view, _| {
            assert!(view.exists(&path("lib/foo.ex")));
            Ok(vec![PatchKind::list_insert(
                path("config/config.json"),
                KeyPath::parse("things").unwrap(),
                json!("Foo"),
            )])
        });

        let plan = service(vec![gen1, gen2], config_snapshot());
        let change_set = plan.plan(&[GeneratorRequest::bare(id("gen1"))]).unwrap();

        let created = change_set.file(&path("lib/foo.ex")).unwrap();
        assert!(created.is_new());
        assert_eq!(created.after, "defmodule App.Foo do\nend\n");

        let config = change_set.file(&path("config/config.json")).unwrap();
        assert_eq!(
            config.after,
            "{\n  \"things\": [\n    \"Bar\",\n    \"Foo\"\n  ]\n}\n"
        );
        assert_eq!(config.operations[0].provenance().generator, id("gen2"));
        assert_eq!(change_set.operations().count(), 2);
    }

    #[test]
    fn cycle_is_reported_before_any_generator_runs() {
        let a = generator(GeneratorDescriptor::new(id("a")).composes(id("b")), |_, _| Ok(vec![]));
        let b = generator(GeneratorDescriptor::new(id("b")).composes(id("a")), |_, _| Ok(vec![]));
        let plan = service(vec![a.clone(), b.clone()], config_snapshot());

        let err = plan.plan(&[GeneratorRequest::bare(id("a"))]).unwrap_err();
        assert!(matches!(err, GraftError::Domain(DomainError::CompositionCycle(_))));
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn conflicting_creates_reject_the_plan() {
        let make = |name: &str, body: &'static str| {
            generator(GeneratorDescriptor::new(id(name)), move |_, _| {
                Ok(vec![PatchKind::create_file(path("lib/foo.ex"), FileContent::literal(body))])
            })
        };
        let plan = service(vec![make("gen1", "one\n"), make("gen2", "two\n")], config_snapshot());

        let err = plan
            .plan(&[GeneratorRequest::bare(id("gen1")), GeneratorRequest::bare(id("gen2"))])
            .unwrap_err();
        let GraftError::Domain(DomainError::Conflicts(report)) = err else {
            panic!("expected conflicts, got {err:?}");
        };
        assert_eq!(report.conflicts.len(), 1);
        let text = report.to_string();
        assert!(text.contains("`gen1`") && text.contains("`gen2`"), "{text}");
    }

    #[test]
    fn structural_failure_does_not_stop_other_operations() {
        let bad = generator(GeneratorDescriptor::new(id("bad")), |_, _| {
            Ok(vec![PatchKind::ensure_value(
                path("config/config.json"),
                KeyPath::parse("things.deep").unwrap(),
                json!(1),
            )])
        });
        let good = generator(GeneratorDescriptor::new(id("good")), |_, _| {
            Ok(vec![PatchKind::create_file(path("NOTES.md"), FileContent::literal("hi\n"))])
        });
        let plan = service(vec![bad, good], config_snapshot());
        let requests = [GeneratorRequest::bare(id("bad")), GeneratorRequest::bare(id("good"))];

        let change_set = plan.merge(&config_snapshot(), &requests).unwrap();
        assert_eq!(change_set.report.failures.len(), 1);
        assert_eq!(change_set.report.failures[0].path, "config/config.json");
        assert!(change_set.file(&path("NOTES.md")).is_some());

        assert!(plan.plan(&requests).is_err());
    }

    fn flagged(name: &str, group: Option<&str>) -> Arc<FnGenerator> {
        let mut descriptor = GeneratorDescriptor::new(id(name)).flag(FlagSpec::string("name"));
        if let Some(group) = group {
            descriptor = descriptor.in_group(Group::new(group).unwrap());
        }
        let file = format!("{name}.txt");
        generator(descriptor, move |_, args| {
            let value = args.string("name").unwrap_or("none").to_string();
            Ok(vec![PatchKind::create_file(path(&file), FileContent::literal(value))])
        })
    }

    #[test]
    fn ambiguous_flags_need_qualified_names() {
        let plan = service(vec![flagged("g1", None), flagged("g2", None)], config_snapshot());

        let err = plan.resolve_flags(&[id("g1"), id("g2")]).unwrap_err();
        let GraftError::Domain(DomainError::AmbiguousFlags(report)) = err else {
            panic!("expected ambiguity");
        };
        assert_eq!(report.ambiguities[0].required, vec!["g1.name", "g2.name"]);

        let bare = |args: &[&str]| {
            let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            vec![
                GeneratorRequest::new(id("g1"), args.clone()),
                GeneratorRequest::new(id("g2"), args),
            ]
        };
        assert!(plan.plan(&bare(&["--name", "x"])).is_err());

        let change_set = plan.plan(&bare(&["--g1.name=x", "--g2.name", "y"])).unwrap();
        assert_eq!(change_set.file(&path("g1.txt")).unwrap().after, "x");
        assert_eq!(change_set.file(&path("g2.txt")).unwrap().after, "y");
    }

    #[test]
    fn shared_group_makes_flag_unambiguous() {
        let plan = service(
            vec![flagged("g1", Some("shared")), flagged("g2", Some("shared"))],
            config_snapshot(),
        );
        let namespace = plan.resolve_flags(&[id("g1"), id("g2")]).unwrap();
        assert_eq!(namespace.get("name").unwrap().targets.len(), 2);

        let args = vec!["--name".to_string(), "z".to_string()];
        let change_set = plan
            .plan(&[
                GeneratorRequest::new(id("g1"), args.clone()),
                GeneratorRequest::new(id("g2"), args),
            ])
            .unwrap();
        assert_eq!(change_set.file(&path("g2.txt")).unwrap().after, "z");
    }

    #[test]
    fn unknown_generator_surfaces_registry_error() {
        let plan = service(vec![], config_snapshot());
        let err = plan.plan(&[GeneratorRequest::bare(id("ghost"))]).unwrap_err();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::UnknownGenerator { .. })
        ));
    }
}
