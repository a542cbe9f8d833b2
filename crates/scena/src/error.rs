//! Error types for Scena operations.
//!
//! Parser and mutation failures are returned as typed results everywhere
//! the public contract is observed; only truly unexpected faults surface
//! as [`ScenaError::System`], and the pipeline boundary converts them so
//! a caller never receives an unhandled fault.

use std::io;

use thiserror::Error;

use scena_core::diagnostic::ValidationReport;
use scena_parser::error::ParseError;

/// The main error type for Scena operations.
///
/// Selector misses are not errors: mutation operations report them
/// through [`crate::mutate::MutationOutcome::NotFound`]. Validation
/// failures are errors only under strict configuration; by default the
/// caller receives the report and decides.
#[derive(Debug, Error)]
pub enum ScenaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error("document failed validation with {} critical diagnostic(s)", .report.count(scena_core::diagnostic::Severity::Critical))]
    Validation { report: ValidationReport },

    #[error("operation `{operation_id}` paused at a stage boundary; resume to continue")]
    ResumableTimeout { operation_id: String },

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("internal error: {0}")]
    System(String),
}

impl ScenaError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }

    /// The operation id carried by a resumable timeout, if this is one.
    pub fn resumable_operation(&self) -> Option<&str> {
        match self {
            ScenaError::ResumableTimeout { operation_id } => Some(operation_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resumable_timeout_carries_operation_id() {
        let err = ScenaError::ResumableTimeout {
            operation_id: "op-42".to_string(),
        };
        assert_eq!(err.resumable_operation(), Some("op-42"));
        assert!(err.to_string().contains("op-42"));
        assert!(err.to_string().contains("resume"));
    }

    #[test]
    fn test_other_errors_are_not_resumable() {
        let err = ScenaError::System("broken".to_string());
        assert_eq!(err.resumable_operation(), None);
    }
}
