//! Apply Service - renders and writes merged change sets.
//!
//! Writing is all-or-nothing:
//! 1. Every file must still hold the text the plan started from
//! 2. Every output is staged next to its target
//! 3. Staged files are renamed into place
//!
//! A failure at any step puts the project back as it was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::{ApplicationError, ApplyError, ports::Filesystem},
    domain::{DomainError, FileChange, FileDiff, MergedChangeSet, RelativePath},
    error::GraftResult,
};

const STAGED_SUFFIX: &str = ".graft-staged";

/// Sibling path an output is staged at before it is committed.
pub fn staged_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}{STAGED_SUFFIX}"))
}

/// Whether `path` names a staging file.
pub fn is_staged_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(STAGED_SUFFIX))
}

/// What an apply wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub run_id: Uuid,
    pub created: Vec<RelativePath>,
    pub modified: Vec<RelativePath>,
}

impl ApplyReport {
    pub fn len(&self) -> usize {
        self.created.len() + self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Files already touched by an apply in progress.
#[derive(Default)]
struct Journal<'a> {
    staged: Vec<PathBuf>,
    committed: Vec<(&'a FileChange, PathBuf)>,
    directories: Vec<PathBuf>,
}

/// Service for showing and writing change sets.
pub struct ApplyService {
    filesystem: Arc<dyn Filesystem>,
    root: PathBuf,
    context_lines: usize,
}

impl ApplyService {
    /// Create an apply service writing under `root`.
    pub fn new(filesystem: Arc<dyn Filesystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            filesystem,
            root: root.into(),
            context_lines: 3,
        }
    }

    /// Lines of unchanged context around each diff hunk.
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unified diff of every changed file, in path order.
    pub fn render(&self, change_set: &MergedChangeSet) -> GraftResult<Vec<FileDiff>> {
        refuse_conflicts(change_set)?;
        Ok(change_set
            .files()
            .map(|change| FileDiff::of(change, self.context_lines))
            .collect())
    }

    /// Write a change set.
    #[instrument(
        skip_all,
        fields(
            run_id = %change_set.run_id,
            root = %self.root.display(),
            files = change_set.files.len()
        )
    )]
    pub fn apply(&self, change_set: &MergedChangeSet) -> GraftResult<ApplyReport> {
        refuse_conflicts(change_set)?;

        for change in change_set.files() {
            let current = self.filesystem.read_to_string(&self.target(change))?;
            if current != change.before {
                warn!(path = %change.path, "File changed since planning");
                return Err(ApplyError::StaleFile {
                    path: change.path.to_string(),
                }
                .into());
            }
        }

        let mut journal = Journal::default();
        for change in change_set.files() {
            if let Err(err) = self.stage(change, &mut journal) {
                warn!(path = %change.path, error = %err, "Staging failed, rolling back");
                self.rollback(journal);
                return Err(ApplyError::StageFailed {
                    path: change.path.to_string(),
                    reason: err.to_string(),
                }
                .into());
            }
        }
        debug!(staged = journal.staged.len(), "All files staged");

        let mut pending = std::mem::take(&mut journal.staged).into_iter();
        for change in change_set.files() {
            let target = self.target(change);
            let Some(staged) = pending.next() else { break };
            if let Err(err) = self.filesystem.rename(&staged, &target) {
                warn!(path = %change.path, error = %err, "Commit failed, rolling back");
                journal.staged.push(staged);
                journal.staged.extend(pending);
                let unrestored = self.rollback(journal);
                return Err(ApplyError::CommitFailed {
                    path: change.path.to_string(),
                    reason: err.to_string(),
                    unrestored,
                }
                .into());
            }
            journal.committed.push((change, target));
        }

        let mut report = ApplyReport {
            run_id: change_set.run_id,
            ..ApplyReport::default()
        };
        for change in change_set.files() {
            if change.is_new() {
                report.created.push(change.path.clone());
            } else {
                report.modified.push(change.path.clone());
            }
        }
        info!(
            created = report.created.len(),
            modified = report.modified.len(),
            "Change set applied"
        );
        Ok(report)
    }

    fn target(&self, change: &FileChange) -> PathBuf {
        self.root.join(change.path.as_path())
    }

    fn stage<'a>(&self, change: &'a FileChange, journal: &mut Journal<'a>) -> GraftResult<()> {
        let target = self.target(change);

        let mut missing = Vec::new();
        let mut current = target.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || self.filesystem.exists(dir) {
                break;
            }
            missing.push(dir.to_path_buf());
            current = dir.parent();
        }
        if let Some(deepest) = missing.first().cloned() {
            // Recorded first so a partial create is cleaned up too.
            journal.directories.extend(missing);
            self.filesystem.create_dir_all(&deepest)?;
        }

        let staged = staged_path(&target);
        if self.filesystem.exists(&staged) {
            return Err(ApplicationError::FilesystemError {
                path: staged,
                reason: "a file is already at the staging path".into(),
            }
            .into());
        }
        // Recorded first so a partial write is cleaned up too.
        journal.staged.push(staged.clone());
        self.filesystem.write_file(&staged, &change.after)
    }

    /// Undo everything in `journal`. Returns the files that could not be put
    /// back.
    fn rollback(&self, journal: Journal<'_>) -> Vec<String> {
        let mut unrestored = Vec::new();

        for (change, target) in journal.committed.iter().rev() {
            let restored = match &change.before {
                Some(before) => self.filesystem.write_file(target, before),
                None => self.filesystem.remove_file(target),
            };
            if let Err(err) = restored {
                warn!(path = %change.path, error = %err, "Rollback could not restore file");
                unrestored.push(change.path.to_string());
            }
        }

        for staged in &journal.staged {
            if self.filesystem.exists(staged) {
                if let Err(err) = self.filesystem.remove_file(staged) {
                    warn!(path = %staged.display(), error = %err, "Rollback left a staged file");
                }
            }
        }

        let mut directories = journal.directories;
        directories.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in &directories {
            if let Err(err) = self.filesystem.remove_dir(dir) {
                warn!(path = %dir.display(), error = %err, "Rollback left a directory");
            }
        }

        if unrestored.is_empty() {
            info!("Rollback successful");
        }
        unrestored
    }
}

fn refuse_conflicts(change_set: &MergedChangeSet) -> GraftResult<()> {
    if change_set.has_conflicts() {
        return Err(DomainError::Conflicts(change_set.report.clone()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFilesystem;
    use crate::domain::{AlreadyExistsConflict, Conflict, Owner};
    use crate::error::GraftError;
    use mockall::Sequence;
    use mockall::predicate::*;
    use std::sync::Mutex;

    fn path(p: &str) -> RelativePath {
        RelativePath::try_new(p).unwrap()
    }

    fn change_set(files: &[(&str, Option<&str>, &str)]) -> MergedChangeSet {
        let mut set = MergedChangeSet::new(Uuid::nil());
        for (p, before, after) in files {
            set.files.insert(
                path(p),
                FileChange {
                    path: path(p),
                    before: before.map(String::from),
                    after: after.to_string(),
                    operations: Vec::new(),
                },
            );
        }
        set
    }

    #[test]
    fn staged_path_is_hidden_sibling() {
        let staged = staged_path(Path::new("/p/config/app.json"));
        assert_eq!(staged, PathBuf::from("/p/config/.app.json.graft-staged"));
        assert!(is_staged_path(&staged));
        assert!(!is_staged_path(Path::new("/p/config/app.json")));
    }

    #[test]
    fn conflicted_change_set_is_refused_without_touching_disk() {
        let mut set = change_set(&[("a.txt", None, "a\n")]);
        set.report.push(Conflict::AlreadyExists(AlreadyExistsConflict {
            path: path("a.txt"),
            claimants: vec![Owner::Project],
        }));

        // No expectations: any filesystem call fails the test.
        let service = ApplyService::new(Arc::new(MockFilesystem::new()), "/p");
        assert!(matches!(
            service.apply(&set),
            Err(GraftError::Domain(DomainError::Conflicts(_)))
        ));
        assert!(service.render(&set).is_err());
    }

    #[test]
    fn stale_file_aborts_before_writing() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string()
            .with(eq(Path::new("/p/a.txt")))
            .returning(|_| Ok(Some("edited meanwhile\n".into())));

        let service = ApplyService::new(Arc::new(fs), "/p");
        let err = service
            .apply(&change_set(&[("a.txt", Some("a\n"), "b\n")]))
            .unwrap_err();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::Apply(ApplyError::StaleFile { ref path })) if path == "a.txt"
        ));
    }

    #[test]
    fn stage_failure_removes_earlier_staged_files() {
        let written = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string().returning(|_| Ok(None));
        let seen = Arc::clone(&written);
        fs.expect_exists()
            .returning(move |p| p == Path::new("/p") || seen.lock().unwrap().iter().any(|w| w == p));
        let seen = Arc::clone(&written);
        fs.expect_write_file()
            .withf(|p, _| p.ends_with(".c.txt.graft-staged"))
            .returning(move |p, _| {
                // a partial write leaves the file behind
                seen.lock().unwrap().push(p.to_path_buf());
                Err(ApplicationError::FilesystemError {
                    path: p.to_path_buf(),
                    reason: "disk full".into(),
                }
                .into())
            });
        let seen = Arc::clone(&written);
        fs.expect_write_file().returning(move |p, _| {
            seen.lock().unwrap().push(p.to_path_buf());
            Ok(())
        });
        fs.expect_remove_file()
            .with(eq(Path::new("/p/.a.txt.graft-staged")))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_remove_file()
            .with(eq(Path::new("/p/.b.txt.graft-staged")))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_remove_file()
            .with(eq(Path::new("/p/.c.txt.graft-staged")))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_rename().never();

        let set = change_set(&[
            ("a.txt", None, "a\n"),
            ("b.txt", None, "b\n"),
            ("c.txt", None, "c\n"),
            ("d.txt", None, "d\n"),
            ("e.txt", None, "e\n"),
        ]);
        let service = ApplyService::new(Arc::new(fs), "/p");
        let err = service.apply(&set).unwrap_err();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::Apply(ApplyError::StageFailed { ref path, .. })) if path == "c.txt"
        ));
    }

    #[test]
    fn commit_failure_restores_committed_files() {
        let mut seq = Sequence::new();
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string()
            .with(eq(Path::new("/p/a.txt")))
            .returning(|_| Ok(Some("old a\n".into())));
        fs.expect_read_to_string().returning(|_| Ok(None));
        fs.expect_exists().returning(|p| p == Path::new("/p"));
        fs.expect_write_file()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        fs.expect_rename()
            .with(eq(Path::new("/p/.a.txt.graft-staged")), eq(Path::new("/p/a.txt")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        fs.expect_rename()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, to| {
                Err(ApplicationError::FilesystemError {
                    path: to.to_path_buf(),
                    reason: "busy".into(),
                }
                .into())
            });
        fs.expect_write_file()
            .with(eq(Path::new("/p/a.txt")), eq("old a\n"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let set = change_set(&[("a.txt", Some("old a\n"), "new a\n"), ("b.txt", None, "b\n")]);
        let service = ApplyService::new(Arc::new(fs), "/p");
        let err = service.apply(&set).unwrap_err();
        let GraftError::Application(ApplicationError::Apply(ApplyError::CommitFailed {
            path,
            unrestored,
            ..
        })) = err
        else {
            panic!("expected commit failure, got {err:?}");
        };
        assert_eq!(path, "b.txt");
        assert!(unrestored.is_empty());
    }

    #[test]
    fn created_directories_are_tracked_and_removed() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string().returning(|_| Ok(None));
        fs.expect_exists().returning(|p| p == Path::new("/p"));
        fs.expect_create_dir_all()
            .with(eq(Path::new("/p/lib/deep")))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_write_file().returning(|p, _| {
            Err(ApplicationError::FilesystemError {
                path: p.to_path_buf(),
                reason: "read-only".into(),
            }
            .into())
        });
        let mut seq = Sequence::new();
        fs.expect_remove_dir()
            .with(eq(Path::new("/p/lib/deep")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        fs.expect_remove_dir()
            .with(eq(Path::new("/p/lib")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let service = ApplyService::new(Arc::new(fs), "/p");
        assert!(service.apply(&change_set(&[("lib/deep/x.ex", None, "x\n")])).is_err());
    }

    #[test]
    fn partially_created_directories_are_removed() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string().returning(|_| Ok(None));
        fs.expect_exists().returning(|p| p == Path::new("/p"));
        fs.expect_create_dir_all()
            .with(eq(Path::new("/p/lib/deep")))
            .times(1)
            .returning(|p| {
                Err(ApplicationError::FilesystemError {
                    path: p.to_path_buf(),
                    reason: "quota exceeded".into(),
                }
                .into())
            });
        fs.expect_write_file().never();
        let mut seq = Sequence::new();
        fs.expect_remove_dir()
            .with(eq(Path::new("/p/lib/deep")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|p| {
                Err(ApplicationError::FilesystemError {
                    path: p.to_path_buf(),
                    reason: "not found".into(),
                }
                .into())
            });
        fs.expect_remove_dir()
            .with(eq(Path::new("/p/lib")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let service = ApplyService::new(Arc::new(fs), "/p");
        let err = service
            .apply(&change_set(&[("lib/deep/x.ex", None, "x\n")]))
            .unwrap_err();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::Apply(ApplyError::StageFailed { ref path, .. })) if path == "lib/deep/x.ex"
        ));
    }

    #[test]
    fn existing_staging_file_is_left_alone() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_to_string().returning(|_| Ok(None));
        fs.expect_exists()
            .returning(|p| p == Path::new("/p") || p == Path::new("/p/.a.txt.graft-staged"));
        fs.expect_write_file().never();
        fs.expect_remove_file().never();
        fs.expect_rename().never();

        let service = ApplyService::new(Arc::new(fs), "/p");
        let err = service
            .apply(&change_set(&[("a.txt", None, "a\n")]))
            .unwrap_err();
        let GraftError::Application(ApplicationError::Apply(ApplyError::StageFailed { path, reason })) = err
        else {
            panic!("expected stage failure, got {err:?}");
        };
        assert_eq!(path, "a.txt");
        assert!(reason.contains("staging path"));
    }

    #[test]
    fn render_produces_one_diff_per_file() {
        let service = ApplyService::new(Arc::new(MockFilesystem::new()), "/p").with_context_lines(1);
        let diffs = service
            .render(&change_set(&[("a.txt", None, "a\n"), ("b.txt", Some("x\n"), "y\n")]))
            .unwrap();
        assert_eq!(diffs.len(), 2);
        assert!(diffs[0].unified.starts_with("--- /dev/null\n+++ b/a.txt\n"));
        assert_eq!((diffs[1].insertions, diffs[1].deletions), (1, 1));
    }
}
