//! Error types for the Redress system
//!
//! Provides a unified error type and domain-specific error variants

use thiserror::Error;

use crate::types::status::GrievanceStatus;

/// Result type alias using RedressError
pub type Result<T> = std::result::Result<T, RedressError>;

/// Unified error type for Redress operations
#[derive(Debug, Error)]
pub enum RedressError {
    // Request validation errors, rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Lifecycle transition errors
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    // Ledger collaborator errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // Relational store errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Evidence store errors
    #[error("Evidence error: {0}")]
    Evidence(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Request validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Evidence payload is not valid base64")]
    MalformedEvidence,

    #[error("Evidence exceeds {limit} byte limit: got {actual}")]
    EvidenceTooLarge { actual: usize, limit: usize },
}

/// Lifecycle transition errors
///
/// Produced by the pure state machine; no I/O has happened when one of
/// these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition: {from} -> {to}")]
    Invalid {
        from: GrievanceStatus,
        to: GrievanceStatus,
    },

    #[error("{status} is terminal: no further transitions permitted")]
    Terminal { status: GrievanceStatus },
}

/// Ledger collaborator errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transient: the submission never entered the pending pool, nothing
    /// changed on either side and the caller may retry.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Permanent for this request (unauthorized signer, unknown target).
    #[error("Ledger rejected submission: {0}")]
    Rejected(String),

    #[error("Record {0} not found on ledger")]
    RecordNotFound(u64),

    #[error("Event subscription closed")]
    SubscriptionClosed,
}

impl From<serde_json::Error> for RedressError {
    fn from(err: serde_json::Error) -> Self {
        RedressError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RedressError {
    fn from(err: std::io::Error) -> Self {
        RedressError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let err = TransitionError::Invalid {
            from: GrievanceStatus::Acknowledged,
            to: GrievanceStatus::Resolved,
        };
        assert!(err.to_string().contains("Acknowledged"));
        assert!(err.to_string().contains("Resolved"));
    }

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::RecordNotFound(42);
        assert!(err.to_string().contains("42"));
    }
}
