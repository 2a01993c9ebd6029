//! Unified error handling for Graft Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::{ApplicationError, ApplyError};
use crate::domain::DomainError;

/// Root error type for Graft Core operations.
#[derive(Debug, Error, Clone)]
pub enum GraftError {
    /// Errors from the domain layer (conflicts, malformed edits, bad flags).
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (orchestration and I/O failures).
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl GraftError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Try: graft config path to locate the active config file".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in Graft".into(),
                "Please report this issue at: https://github.com/cosecruz/graft/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Conflict => ErrorCategory::Conflict,
                crate::domain::ErrorCategory::Structural => ErrorCategory::Structural,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Check if this error is retryable.
    ///
    /// A stale file means the project moved under a plan; planning again
    /// picks up the new text.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Application(ApplicationError::StoreLockError)
                | Self::Application(ApplicationError::Apply(ApplyError::StaleFile { .. }))
        )
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Structural,
    NotFound,
    Configuration,
    Internal,
}

impl From<ApplyError> for GraftError {
    fn from(err: ApplyError) -> Self {
        Self::Application(ApplicationError::Apply(err))
    }
}

/// Convenient result type alias.
pub type GraftResult<T> = Result<T, GraftError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> GraftResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> GraftResult<T> {
        self.map_err(|e| GraftError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConflictReport, GeneratorId};

    #[test]
    fn conflicts_are_conflict_category() {
        let err: GraftError = DomainError::Conflicts(ConflictReport::default()).into();
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert!(!err.is_retryable());
    }

    #[test]
    fn stale_file_is_retryable() {
        let err: GraftError = ApplicationError::from(ApplyError::StaleFile {
            path: "a.txt".into(),
        })
        .into();
        assert!(err.is_retryable());
    }

    #[test]
    fn apply_errors_convert_straight_to_root() {
        let err: GraftError = ApplyError::StageFailed {
            path: "a.txt".into(),
            reason: "disk full".into(),
        }
        .into();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::Apply(ApplyError::StageFailed { .. }))
        ));
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn unknown_generator_is_not_found() {
        let err: GraftError = ApplicationError::UnknownGenerator {
            id: GeneratorId::new("nope").unwrap(),
            available: vec!["readme".into()],
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.suggestions().iter().any(|s| s.contains("readme")));
    }

    #[test]
    fn context_wraps_as_internal() {
        let res: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = res.context("reading manifest").unwrap_err();
        assert!(matches!(err, GraftError::Internal { ref message } if message == "reading manifest: boom"));
    }
}
