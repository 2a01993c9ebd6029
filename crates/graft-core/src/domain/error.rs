// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

use crate::domain::entities::{
    changeset::ConflictReport, composition::CompositionCycleError, flags::AmbiguousFlagReport,
};

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (reports are rendered more than once by the CLI)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid key path '{0}'")]
    InvalidKeyPath(String),

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes the project root: {path}")]
    PathEscapesRoot { path: String },

    #[error("Invalid merge strategy '{0}'")]
    InvalidMergeStrategy(String),

    #[error("Invalid dedupe predicate '{0}'")]
    InvalidDedupe(String),

    // ========================================================================
    // Structural Errors (a single edit target is malformed or unsupported)
    // ========================================================================
    #[error("Structural error in {path} at {location}: {reason}")]
    Structural {
        path: String,
        location: String,
        reason: String,
    },

    #[error("Syntax error in {path} at {line}:{column}: {message}")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    // ========================================================================
    // Flag Errors
    // ========================================================================
    #[error("Unknown flag '--{flag}'")]
    UnknownFlag { flag: String },

    #[error("Flag '--{flag}' expects {expected}, got '{got}'")]
    InvalidFlagValue {
        flag: String,
        expected: String,
        got: String,
    },

    #[error("Flag '--{flag}' requires a value")]
    MissingFlagValue { flag: String },

    #[error("{0}")]
    AmbiguousFlags(AmbiguousFlagReport),

    // ========================================================================
    // Composition Errors
    // ========================================================================
    #[error("{0}")]
    CompositionCycle(CompositionCycleError),

    #[error("Generator '{generator}' failed: {reason}")]
    GeneratorFailed { generator: String, reason: String },

    #[error("{0}")]
    Conflicts(ConflictReport),
}

impl DomainError {
    /// Shorthand for a structural failure at an unknown location.
    pub fn structural(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Structural {
            path: path.into(),
            location: "<root>".into(),
            reason: reason.into(),
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidIdentifier { kind, .. } => vec![
                format!("A {kind} may only contain letters, digits, '-', '_' and ':'"),
                "Dots are reserved for qualified flag names (--group.flag)".into(),
            ],
            Self::Structural { path, .. } | Self::Syntax { path, .. } => vec![
                format!("Inspect {path}; the edit target is malformed or unsupported"),
                "Other files in the run were still planned; fix this one and re-run".into(),
            ],
            Self::UnknownFlag { flag } => vec![
                format!("'--{flag}' is not declared by any participating generator"),
                "Try: graft describe <generator> to see accepted flags".into(),
            ],
            Self::AmbiguousFlags(report) => {
                let mut out = vec!["Re-run with the qualified flag names:".to_string()];
                for ambiguity in &report.ambiguities {
                    for form in &ambiguity.required {
                        out.push(format!("  • --{form}"));
                    }
                }
                out
            }
            Self::CompositionCycle(cycle) => vec![
                format!("Composition chain: {}", cycle.chain_display()),
                "Remove one of the composed generators to break the cycle".into(),
            ],
            Self::Conflicts(report) => report.suggestions(),
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidIdentifier { .. }
            | Self::InvalidKeyPath(_)
            | Self::AbsolutePathNotAllowed { .. }
            | Self::PathEscapesRoot { .. }
            | Self::InvalidMergeStrategy(_)
            | Self::InvalidDedupe(_)
            | Self::UnknownFlag { .. }
            | Self::InvalidFlagValue { .. }
            | Self::MissingFlagValue { .. }
            | Self::GeneratorFailed { .. } => ErrorCategory::Validation,
            Self::AmbiguousFlags(_) | Self::CompositionCycle(_) | Self::Conflicts(_) => {
                ErrorCategory::Conflict
            }
            Self::Structural { .. } | Self::Syntax { .. } => ErrorCategory::Structural,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Structural,
}
