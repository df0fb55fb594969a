//! JSON output types for the `decap` command line.
//!
//! Every response is an envelope with `status` first and a `schema_version`,
//! so consumers can branch on success before reading the payload.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::config::ConfigSource;
use crate::cost::CostEntry;
use crate::error::{DecapError, OutputErrorCode};
use crate::report::Report;

/// Current schema version for JSON output.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a DecapError.
    pub fn from_error(err: &DecapError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();
        let details = match err {
            DecapError::InvalidArguments { details, .. } => details.clone(),
            DecapError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            DecapError::InvalidConfig { path, .. } => Some(serde_json::json!({ "path": path })),
            DecapError::InconsistentHistory {
                revision_id,
                edit_index,
                edit_kind,
                ..
            } => Some(serde_json::json!({
                "revision_id": revision_id,
                "edit_index": edit_index,
                "edit": edit_kind,
            })),
            DecapError::MalformedHistory { .. } | DecapError::InternalError { .. } => None,
        };
        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(error: ErrorInfo) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error,
        }
    }

    pub fn from_error(err: &DecapError) -> Self {
        ErrorResponse::new(ErrorInfo::from_error(err))
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Effective settings echoed back in analysis responses.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsInfo {
    pub ignore_constants: bool,
    pub ignore_constants_source: ConfigSource,
    pub include_clean: bool,
    pub resolvers: Vec<String>,
}

/// Response for `decap analyze`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// Number of transactions replayed.
    pub transactions: usize,
    pub settings: SettingsInfo,
    pub report: Report,
}

impl AnalyzeResponse {
    pub fn new(transactions: usize, settings: SettingsInfo, report: Report) -> Self {
        AnalyzeResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            transactions,
            settings,
            report,
        }
    }
}

/// Response for `decap cost`.
#[derive(Debug, Clone, Serialize)]
pub struct CostResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub transactions: usize,
    /// Nodes by descending visibility cost.
    pub costs: Vec<CostEntry>,
}

impl CostResponse {
    pub fn new(transactions: usize, costs: Vec<CostEntry>) -> Self {
        CostResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            transactions,
            costs,
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
