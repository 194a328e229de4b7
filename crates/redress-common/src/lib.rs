//! # Redress Common
//!
//! Shared types and errors for the Redress grievance ledger.
//!
//! ## Core Types
//!
//! - [`GrievanceStatus`]: the six-state grievance lifecycle (stable codes 0-5)
//! - [`Sentiment`]: keyword-derived classification of a grievance title
//! - [`GrievanceRecord`]: the ledger-authoritative view of a grievance
//! - [`GrievanceRow`]: the relational projection of a grievance
//! - [`SubmissionRecord`]: correlation entry linking a local write to its
//!   eventual ledger confirmation
//! - [`AuditEntry`]: immutable transition row appended by the projector

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{LedgerError, RedressError, Result, TransitionError, ValidationError};
pub use types::{
    grievance::{GrievanceRecord, GrievanceRow},
    sentiment::Sentiment,
    status::GrievanceStatus,
    submission::{
        AuditEntry, ConfirmationState, ContentAddress, SubmissionHandle, SubmissionKind,
        SubmissionRecord,
    },
};

/// Redress version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bounded timeout applied to every ledger submit call, in milliseconds
pub const SUBMIT_TIMEOUT_MS: u64 = 15_000;

/// Upper bound on a single evidence upload, in bytes (5 MiB)
pub const EVIDENCE_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Number of lifecycle states
pub const STATUS_COUNT: u8 = 6;
