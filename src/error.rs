// 🧯 Error taxonomy for the comparison core
// Every variant here is recoverable: callers record it and substitute a default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rich-text node whose shape cannot be interpreted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlattenError {
    #[error("malformed node at {path}: {reason}")]
    MalformedNode { path: String, reason: String },
}

/// Degenerate input for the vector-space similarity
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    #[error("vectorization failed: {0}")]
    Vectorization(String),
}

/// Failure to ingest one record from a source system
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("record {index} unavailable: {reason}")]
    SourceUnavailable { index: usize, reason: String },

    #[error("record {index} has no key in column '{column}'")]
    MissingKey { index: usize, column: String },
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    MalformedNode,
    SourceUnavailable,
    MissingKey,
}

/// A recorded, non-fatal failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl From<&FlattenError> for Diagnostic {
    fn from(err: &FlattenError) -> Self {
        Diagnostic {
            kind: DiagnosticKind::MalformedNode,
            message: err.to_string(),
        }
    }
}

impl From<&IngestError> for Diagnostic {
    fn from(err: &IngestError) -> Self {
        let kind = match err {
            IngestError::SourceUnavailable { .. } => DiagnosticKind::SourceUnavailable,
            IngestError::MissingKey { .. } => DiagnosticKind::MissingKey,
        };
        Diagnostic {
            kind,
            message: err.to_string(),
        }
    }
}
