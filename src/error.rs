//! Error taxonomy for the catalog pipeline.
//!
//! Input-shape problems are resolved at the validator/query boundary and
//! never reach the catalog store. Storage and codec faults during background
//! processing become record-level state (`Failed`), not request errors.

use crate::photo::ProcessingStatus;
use thiserror::Error;

/// Errors surfaced by the catalog pipeline
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Malformed, oversized, wrong-type, or corrupt-signature input.
    /// Reported per file; sibling files in the batch are unaffected.
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Record missing or not owned by the caller. The two cases are
    /// deliberately indistinguishable so callers cannot confirm the
    /// existence of other users' records.
    #[error("photo not found")]
    NotFound,

    /// Blob backend unreachable or a read/write failed. Retryable at the
    /// operation level.
    #[error("storage backend failure: {0}")]
    Storage(String),

    /// Codec or analysis failure during background processing. Recorded
    /// into the photo record rather than propagated to a request.
    #[error("processing failure: {0}")]
    Processing(String),

    /// A status transition the state machine does not permit.
    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    /// A persisted row that no longer deserializes into a photo record.
    #[error("corrupt catalog row: {0}")]
    CorruptRecord(String),

    /// Datastore-level fault. Propagates as a service-level error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// Build a per-file validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = CatalogError::validation("files[3]", "file exceeds maximum size");
        assert_eq!(
            err.to_string(),
            "validation failed for files[3]: file exceeds maximum size"
        );
    }

    #[test]
    fn test_not_found_is_opaque() {
        // Missing and not-owned records must render identically.
        assert_eq!(CatalogError::NotFound.to_string(), "photo not found");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = CatalogError::InvalidTransition {
            from: ProcessingStatus::Completed,
            to: ProcessingStatus::Uploaded,
        };
        assert_eq!(
            err.to_string(),
            "illegal status transition: completed -> uploaded"
        );
    }
}
