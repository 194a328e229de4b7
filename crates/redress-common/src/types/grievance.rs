//! Grievance entities: the ledger-authoritative record and its relational
//! projection
//!
//! [`GrievanceRecord`] is what the ledger holds; it is immutable once
//! created except for `status` and `last_updated_at`. [`GrievanceRow`] is
//! the cached copy the query paths read, owned exclusively by the
//! synchronization engine.

use serde::{Deserialize, Serialize};

use crate::types::sentiment::Sentiment;
use crate::types::status::GrievanceStatus;
use crate::types::submission::ContentAddress;

/// Ledger-authoritative view of a grievance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrievanceRecord {
    /// Assigned by the ledger at finalization; absent while pending
    pub ledger_id: Option<u64>,

    /// Submitter's registry identifier (e.g. "S001")
    pub submitter_id: String,

    pub title: String,

    /// Content address of the evidence blob
    pub evidence_ref: ContentAddress,

    pub status: GrievanceStatus,

    /// Ledger clock, unix seconds
    pub created_at: i64,

    /// Ledger clock, unix seconds; moves on every accepted status update
    pub last_updated_at: i64,
}

/// Relational projection of a grievance
///
/// `ledger_id` is null exactly while the creating ledger write is
/// unconfirmed; once set it is immutable and unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrievanceRow {
    /// Internal row id
    pub id: i64,

    /// Ledger-assigned identifier, set by the projector on confirmation
    pub ledger_id: Option<u64>,

    /// Internal row id of the submitting student
    pub submitter_row_id: i64,

    /// Submitter's registry identifier, denormalized for display
    pub submitter_id: String,

    pub title: String,

    /// Free-text category chosen at submission ("Academic", "Hostel", ...)
    pub category: String,

    pub evidence_ref: ContentAddress,

    pub status: GrievanceStatus,

    pub sentiment: Sentiment,

    /// Internal row id of the administrator who closed the grievance;
    /// written by the synchronous status path on terminal transitions
    pub resolved_by: Option<i64>,

    /// Unix seconds; local clock until the creation event overwrites it
    /// with the ledger's
    pub created_at: i64,

    /// Unix seconds; moves with every projected status change
    pub updated_at: i64,
}

impl GrievanceRow {
    /// Whether the creating ledger write has been confirmed
    pub fn is_confirmed(&self) -> bool {
        self.ledger_id.is_some()
    }
}
