//! Integration tests for graft-core: plan, render, apply and re-plan through
//! the public API only.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use graft_core::application::{ApplicationError, ApplyError};
use graft_core::domain::{DiffStatus, DomainError, FileContent, KeyPath};
use graft_core::prelude::*;
use serde_json::json;

/// Disk stand-in whose renames can be made to fail for one target.
#[derive(Default)]
struct MapFs {
    files: Mutex<BTreeMap<PathBuf, String>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    fail_rename_to: Option<PathBuf>,
}

impl MapFs {
    fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        self.files.lock().unwrap().clone()
    }
}

fn io_error(path: &Path, reason: &str) -> GraftError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

impl Filesystem for MapFs {
    fn read_to_string(&self, path: &Path) -> GraftResult<Option<String>> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    fn write_file(&self, path: &Path, content: &str) -> GraftResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> GraftResult<()> {
        let mut dirs = self.dirs.lock().unwrap();
        for dir in path.ancestors() {
            dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> GraftResult<()> {
        if self.fail_rename_to.as_deref() == Some(to) {
            return Err(io_error(to, "injected failure"));
        }
        let mut files = self.files.lock().unwrap();
        let content = files.remove(from).ok_or_else(|| io_error(from, "missing"))?;
        files.insert(to.to_path_buf(), content);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> GraftResult<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io_error(path, "missing"))
    }

    fn remove_dir(&self, path: &Path) -> GraftResult<()> {
        self.dirs.lock().unwrap().remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path == Path::new("/proj")
            || self.files.lock().unwrap().contains_key(path)
            || self.dirs.lock().unwrap().contains(path)
    }
}

/// Reads the project back out of a `MapFs`.
struct FsLoader(Arc<MapFs>);

impl ProjectLoader for FsLoader {
    fn load(&self) -> GraftResult<ProjectSnapshot> {
        let mut snapshot = ProjectSnapshot::new("/proj", "demo_app");
        for (path, content) in self.0.snapshot() {
            let Ok(relative) = path.strip_prefix("/proj") else { continue };
            snapshot.insert(RelativePath::try_new(relative)?, content.as_str());
        }
        Ok(snapshot)
    }
}

#[derive(Default)]
struct MapRegistry(Mutex<BTreeMap<GeneratorId, Arc<dyn Generator>>>);

impl GeneratorRegistry for MapRegistry {
    fn lookup(&self, id: &GeneratorId) -> GraftResult<Arc<dyn Generator>> {
        self.0.lock().unwrap().get(id).cloned().ok_or_else(|| {
            ApplicationError::UnknownGenerator {
                id: id.clone(),
                available: Vec::new(),
            }
            .into()
        })
    }

    fn list(&self) -> GraftResult<Vec<Arc<dyn Generator>>> {
        Ok(self.0.lock().unwrap().values().cloned().collect())
    }

    fn insert(&self, generator: Arc<dyn Generator>) -> GraftResult<()> {
        self.0
            .lock()
            .unwrap()
            .insert(generator.id().clone(), generator);
        Ok(())
    }
}

/// Creates `lib/foo.ex` unless it exists, then composes `gen2`.
struct Gen1(GeneratorDescriptor);

impl Generator for Gen1 {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.0
    }

    fn run(&self, view: &ProjectView<'_>, _: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        let path = RelativePath::try_new("lib/foo.ex")?;
        if view.exists(&path) {
            return Ok(Vec::new());
        }
        Ok(vec![PatchKind::create_file(
            path,
            FileContent::template("defmodule {{PROJECT_NAME_PASCAL}}.Foo do\nend\n"),
        )])
    }
}

/// Appends `"Foo"` to the `things` list.
struct Gen2(GeneratorDescriptor);

impl Generator for Gen2 {
    fn descriptor(&self) -> &GeneratorDescriptor {
        &self.0
    }

    fn run(&self, _: &ProjectView<'_>, _: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
        Ok(vec![PatchKind::list_insert(
            RelativePath::try_new("config/config.json")?,
            KeyPath::parse("things")?,
            json!("Foo"),
        )])
    }
}

fn id(s: &str) -> GeneratorId {
    GeneratorId::new(s).unwrap()
}

fn services(fs: Arc<MapFs>) -> (PlanService, ApplyService) {
    let registry = Arc::new(MapRegistry::default());
    registry
        .insert(Arc::new(Gen1(GeneratorDescriptor::new(id("gen1")).composes(id("gen2")))))
        .unwrap();
    registry
        .insert(Arc::new(Gen2(GeneratorDescriptor::new(id("gen2")))))
        .unwrap();
    let plan = PlanService::new(registry, Arc::new(FsLoader(fs.clone())));
    (plan, ApplyService::new(fs, "/proj"))
}

const CONFIG: &str = "{\n  // plugin list\n  \"things\": [\n    \"Bar\",\n  ],\n}\n";

#[test]
fn plan_render_apply_then_replan_is_empty() {
    let fs = Arc::new(MapFs::default().with_file("/proj/config/config.json", CONFIG));
    let (plan, apply) = services(fs.clone());
    let requests = [GeneratorRequest::bare(id("gen1"))];

    let change_set = plan.plan(&requests).unwrap();
    assert_eq!(change_set.operations().count(), 2);

    let diffs = apply.render(&change_set).unwrap();
    assert_eq!(diffs.len(), 2);
    let config = diffs.iter().find(|d| d.status == DiffStatus::Modified).unwrap();
    assert_eq!((config.insertions, config.deletions), (1, 0));
    assert!(config.unified.contains("+    \"Foo\",\n"));
    let created = diffs.iter().find(|d| d.status == DiffStatus::Created).unwrap();
    assert!(created.unified.starts_with("--- /dev/null\n+++ b/lib/foo.ex\n"));

    let report = apply.apply(&change_set).unwrap();
    assert_eq!(report.len(), 2);
    let files = fs.snapshot();
    assert_eq!(
        files[Path::new("/proj/lib/foo.ex")],
        "defmodule DemoApp.Foo do\nend\n"
    );
    assert!(files[Path::new("/proj/config/config.json")].contains("// plugin list"));
    assert!(!files.keys().any(|p| p.to_string_lossy().contains("graft-staged")));

    let again = plan.plan(&requests).unwrap();
    assert!(again.is_empty(), "second run should be a no-op: {again:?}");
}

#[test]
fn failed_commit_leaves_project_untouched() {
    let mut fs = MapFs::default();
    for name in ["a", "b", "c", "d", "e"] {
        fs = fs.with_file(&format!("/proj/{name}.txt"), "old\n");
    }
    fs.fail_rename_to = Some(PathBuf::from("/proj/c.txt"));
    let fs = Arc::new(fs);
    let before = fs.snapshot();

    let mut change_set = MergedChangeSet::new(uuid_nil());
    for name in ["a", "b", "c", "d", "e"] {
        let path = RelativePath::try_new(format!("{name}.txt")).unwrap();
        change_set.files.insert(
            path.clone(),
            graft_core::domain::FileChange {
                path,
                before: Some("old\n".into()),
                after: "new\n".into(),
                operations: Vec::new(),
            },
        );
    }

    let apply = ApplyService::new(fs.clone(), "/proj");
    let err = apply.apply(&change_set).unwrap_err();
    assert!(matches!(
        err,
        GraftError::Application(ApplicationError::Apply(ApplyError::CommitFailed { ref path, ref unrestored, .. }))
            if path == "c.txt" && unrestored.is_empty()
    ));
    assert_eq!(fs.snapshot(), before);
}

#[test]
fn stale_snapshot_is_refused() {
    let fs = Arc::new(MapFs::default().with_file("/proj/config/config.json", CONFIG));
    let (plan, apply) = services(fs.clone());
    let change_set = plan.plan(&[GeneratorRequest::bare(id("gen2"))]).unwrap();

    fs.write_file(Path::new("/proj/config/config.json"), "{}\n").unwrap();
    let err = apply.apply(&change_set).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(fs.snapshot()[Path::new("/proj/config/config.json")], "{}\n");
}

fn uuid_nil() -> uuid::Uuid {
    uuid::Uuid::nil()
}
