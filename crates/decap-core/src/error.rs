//! Error types and error code constants for decap.
//!
//! `DecapError` is the single error type surfaced by the tracker, the history
//! reader, configuration loading and the CLI. Layer-specific errors are bridged
//! into it with `From` impls; [`OutputErrorCode`] maps every variant to a
//! stable process exit code.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Inconsistent history (an edit does not match the replayed model)
//! - `4`: Malformed input (unreadable history or configuration)
//! - `10`: Internal errors (IO failures, bugs)

use std::fmt;

use thiserror::Error;

use crate::model::ModelError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// The history contradicts the replayed source model.
    InconsistentHistory = 3,
    /// History or configuration could not be parsed.
    MalformedInput = 4,
    /// Internal errors (IO failures, unexpected state).
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

/// Unified error type for the analysis engine and its front door.
#[derive(Debug, Error)]
pub enum DecapError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// An edit could not be applied; replay stops here.
    #[error("inconsistent history at revision '{revision_id}', edit #{edit_index} ({edit_kind}): {source}")]
    InconsistentHistory {
        revision_id: String,
        edit_index: usize,
        edit_kind: &'static str,
        #[source]
        source: ModelError,
    },

    /// A history record could not be decoded.
    #[error("malformed history: {message}")]
    MalformedHistory { message: String },

    /// A configuration file could not be decoded.
    #[error("invalid configuration {path}: {message}")]
    InvalidConfig { path: String, message: String },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Internal error (IO failure, bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

/// Result alias used across the crate.
pub type DecapResult<T> = Result<T, DecapError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&DecapError> for OutputErrorCode {
    fn from(err: &DecapError) -> Self {
        match err {
            DecapError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DecapError::FileNotFound { .. } => OutputErrorCode::InvalidArguments,
            DecapError::InconsistentHistory { .. } => OutputErrorCode::InconsistentHistory,
            DecapError::MalformedHistory { .. } => OutputErrorCode::MalformedInput,
            DecapError::InvalidConfig { .. } => OutputErrorCode::MalformedInput,
            DecapError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<DecapError> for OutputErrorCode {
    fn from(err: DecapError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<std::io::Error> for DecapError {
    fn from(err: std::io::Error) -> Self {
        DecapError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl DecapError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DecapError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        DecapError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a malformed history error.
    pub fn malformed_history(message: impl Into<String>) -> Self {
        DecapError::MalformedHistory {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        DecapError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DecapError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn inconsistent_history_maps_to_three() {
            let err = DecapError::InconsistentHistory {
                revision_id: "r1".to_string(),
                edit_index: 0,
                edit_kind: "remove_node",
                source: ModelError::NodeNotFound {
                    id: "A.java".to_string(),
                },
            };
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::InconsistentHistory
            );
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn invalid_arguments_maps_to_two() {
            let err = DecapError::invalid_args("missing history path");
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn file_not_found_maps_to_invalid_arguments() {
            let err = DecapError::file_not_found("history.jsonl");
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        }

        #[test]
        fn malformed_input_maps_to_four() {
            assert_eq!(
                DecapError::malformed_history("bad json").error_code().code(),
                4
            );
            let err = DecapError::InvalidConfig {
                path: "decap.toml".to_string(),
                message: "expected a boolean".to_string(),
            };
            assert_eq!(err.error_code(), OutputErrorCode::MalformedInput);
        }

        #[test]
        fn io_error_bridges_to_internal() {
            let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
            let err = DecapError::from(io);
            assert_eq!(err.error_code().code(), 10);
            assert!(err.to_string().contains("disk on fire"));
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn inconsistent_history_names_revision_and_edit() {
            let err = DecapError::InconsistentHistory {
                revision_id: "abc123".to_string(),
                edit_index: 2,
                edit_kind: "edit_variable",
                source: ModelError::NodeNotFound {
                    id: "A.java:A:x".to_string(),
                },
            };
            assert_eq!(
                err.to_string(),
                "inconsistent history at revision 'abc123', edit #2 (edit_variable): node not found: 'A.java:A:x'"
            );
        }

        #[test]
        fn invalid_arguments_display() {
            let err = DecapError::invalid_args("missing field");
            assert_eq!(err.to_string(), "invalid arguments: missing field");
        }
    }
}
