//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::GeneratorId;
use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// No registered generator has this id.
    #[error("Unknown generator '{id}'")]
    UnknownGenerator {
        id: GeneratorId,
        available: Vec<String>,
    },

    /// Writing the change set failed; the project is as it was.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Registry access failed (lock poisoned, etc.).
    #[error("Generator registry error")]
    StoreLockError,

    /// The project or a generator manifest could not be read.
    #[error("Failed to load {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },

    /// Validation failed (application-level, not domain).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Failures while writing a change set.
///
/// Every variant is raised only after the target has been put back the way
/// it was, except [`ApplyError::CommitFailed`] with a non-empty `unrestored`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The file changed on disk after the plan was made.
    #[error("{path} changed since the plan was made")]
    StaleFile { path: String },

    /// Writing the staged copy failed.
    #[error("Failed to stage {path}: {reason}")]
    StageFailed { path: String, reason: String },

    /// Moving a staged file into place failed.
    #[error("Failed to commit {path}: {reason}")]
    CommitFailed {
        path: String,
        reason: String,
        /// Files rollback could not restore.
        unrestored: Vec<String>,
    },
}

impl ApplyError {
    pub fn path(&self) -> &str {
        match self {
            Self::StaleFile { path }
            | Self::StageFailed { path, .. }
            | Self::CommitFailed { path, .. } => path,
        }
    }
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownGenerator { available, .. } => {
                let mut out = vec!["Try: graft list to see available generators".to_string()];
                if !available.is_empty() {
                    out.push(format!("Available: {}", available.join(", ")));
                }
                out
            }
            Self::Apply(ApplyError::StaleFile { path }) => vec![
                format!("{path} was modified while the plan was pending"),
                "Run the command again to plan against the current files".into(),
            ],
            Self::Apply(ApplyError::CommitFailed { unrestored, .. }) if !unrestored.is_empty() => {
                let mut out = vec!["Rollback could not restore these files:".to_string()];
                out.extend(unrestored.iter().map(|p| format!("  • {p}")));
                out
            }
            Self::Apply(_) => vec![
                "No file was changed".into(),
                "Check that you have write permissions in the project".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::StoreLockError => vec![
                "The generator registry is locked".into(),
                "Try again in a moment".into(),
            ],
            Self::LoadFailed { path, .. } => vec![
                format!("Check that {} exists and is readable", path.display()),
            ],
            Self::ValidationFailed(_) => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownGenerator { .. } => ErrorCategory::NotFound,
            Self::LoadFailed { .. } => ErrorCategory::NotFound,
            Self::Apply(ApplyError::StaleFile { .. }) => ErrorCategory::Conflict,
            Self::Apply(_) | Self::FilesystemError { .. } | Self::StoreLockError => {
                ErrorCategory::Internal
            }
            Self::ValidationFailed(_) => ErrorCategory::Validation,
        }
    }
}
