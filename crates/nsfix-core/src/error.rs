//! Error types and error code constants for nsfix.
//!
//! `NsfixError` is the single error type the CLI renders. Subsystem errors
//! (patch conflicts, apply failures, configuration problems) bridge into it
//! via `From`.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller, unreadable config)
//! - `3`: Analysis errors (a unit could not be read or analyzed)
//! - `4`: Apply errors (failed to write changes, stale content)
//! - `10`: Internal errors (conflicting patches, unexpected state)

use std::fmt;
use std::io;

use thiserror::Error;

use crate::apply::ApplyError;
use crate::config::ConfigError;
use crate::patch::PatchConflict;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes, used as process exit codes and in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed configuration).
    InvalidArguments = 2,
    /// A unit could not be read or analyzed.
    AnalysisError = 3,
    /// Apply errors (failed to write changes, stale content).
    ApplyError = 4,
    /// Internal errors (conflicting patches, bugs).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum NsfixError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The front end failed on a unit.
    #[error("analysis failed for {file}: {message}")]
    Analysis { file: String, message: String },

    /// Two passes produced incompatible edits.
    #[error(transparent)]
    Conflict(#[from] PatchConflict),

    /// Patches could not be applied to a file.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// One or more files failed to apply; details were reported per file.
    #[error("failed to apply patches to {count} file(s)")]
    ApplyFailed { count: usize },

    /// I/O error outside of patch application.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl NsfixError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        NsfixError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        NsfixError::FileNotFound { path: path.into() }
    }

    pub fn analysis(file: impl Into<String>, message: impl Into<String>) -> Self {
        NsfixError::Analysis {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        NsfixError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        NsfixError::Internal {
            message: message.into(),
        }
    }

    /// Error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        match self {
            NsfixError::InvalidArguments { .. } | NsfixError::Config(_) => {
                OutputErrorCode::InvalidArguments
            }
            NsfixError::FileNotFound { .. }
            | NsfixError::Analysis { .. }
            | NsfixError::Io { .. } => OutputErrorCode::AnalysisError,
            NsfixError::Apply(_) | NsfixError::ApplyFailed { .. } => OutputErrorCode::ApplyError,
            NsfixError::Conflict(_) | NsfixError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}
