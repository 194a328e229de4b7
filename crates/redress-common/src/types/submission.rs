//! Submission correlation types
//!
//! A [`SubmissionHandle`] is the identifier the ledger returns the moment a
//! write enters its pending pool. It is the only value both sides agree on
//! before finalization, so every locally-initiated write is recorded under
//! its handle and the event projector matches finalization events back to
//! local state through it. Submission records are never deleted; together
//! with the projector's [`AuditEntry`] rows they form the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::status::GrievanceStatus;

/// Identifier returned synchronously when a write is accepted into the
/// ledger's pending pool; globally unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionHandle(pub String);

impl SubmissionHandle {
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SubmissionHandle {
    fn from(inner: String) -> Self {
        Self(inner)
    }
}

/// Content address of an evidence blob in the evidence store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(pub String);

impl ContentAddress {
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of write a submission represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Create,
    StatusUpdate,
}

impl SubmissionKind {
    /// Label stored in the relational submissions table
    pub fn label(self) -> &'static str {
        match self {
            SubmissionKind::Create => "CREATE",
            SubmissionKind::StatusUpdate => "STATUS_UPDATE",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "CREATE" => Some(SubmissionKind::Create),
            "STATUS_UPDATE" => Some(SubmissionKind::StatusUpdate),
            _ => None,
        }
    }
}

/// Confirmation state of a submission; monotonic, Pending -> Confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    Pending,
    Confirmed,
}

impl ConfirmationState {
    pub fn label(self) -> &'static str {
        match self {
            ConfirmationState::Pending => "PENDING",
            ConfirmationState::Confirmed => "CONFIRMED",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PENDING" => Some(ConfirmationState::Pending),
            "CONFIRMED" => Some(ConfirmationState::Confirmed),
            _ => None,
        }
    }
}

/// One row per locally-initiated write, keyed by its submission handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Correlation key, unique across all submissions
    pub handle: SubmissionHandle,

    /// Creation or status update
    pub kind: SubmissionKind,

    /// Internal row id of the grievance this write targets
    pub row_id: i64,

    /// Status the grievance will hold once the write is confirmed
    pub expected_status: GrievanceStatus,

    /// Internal row id of the initiating actor, if an administrator
    pub actor_row_id: Option<i64>,

    /// Pending until the projector observes the finalization event
    pub state: ConfirmationState,

    pub created_at: DateTime<Utc>,

    /// Set exactly once, by the projector
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl SubmissionRecord {
    pub fn is_confirmed(&self) -> bool {
        self.state == ConfirmationState::Confirmed
    }
}

/// Immutable transition row appended by the projector inside the
/// confirmation transaction; exactly one per confirmed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,

    /// Internal row id of the grievance
    pub row_id: i64,

    /// Ledger-assigned identifier, known at confirmation time
    pub ledger_id: u64,

    /// None for the creation event
    pub from_status: Option<GrievanceStatus>,

    pub to_status: GrievanceStatus,

    /// Handle of the submission this entry confirms
    pub handle: SubmissionHandle,

    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            SubmissionKind::from_label(SubmissionKind::Create.label()),
            Some(SubmissionKind::Create)
        );
        assert_eq!(SubmissionKind::from_label("DELETE"), None);
    }

    #[test]
    fn test_handle_serde_transparent() {
        let handle = SubmissionHandle::new("0xabc");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "\"0xabc\"");
    }
}
