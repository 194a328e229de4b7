//! Finalization events emitted by the ledger
//!
//! Delivery is at-least-once: duplicates and replays are normal and the
//! projector must tolerate them. Events of one kind arrive in emission
//! order; there is no ordering guarantee across kinds.

use redress_common::{GrievanceStatus, SubmissionHandle};
use serde::{Deserialize, Serialize};

/// The event kinds a subscriber can open a feed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    RecordCreated,
    StatusChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::RecordCreated, EventKind::StatusChanged];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::RecordCreated => "RecordCreated",
            EventKind::StatusChanged => "StatusChanged",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finalized ledger write
///
/// The submission handle is the correlation key: for creation events it is
/// the identifier under which the write was originally submitted, not the
/// ledger-assigned numeric id (which only exists from this event onward).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LedgerEvent {
    /// A creation write was finalized and assigned its numeric id
    RecordCreated {
        handle: SubmissionHandle,
        ledger_id: u64,
        submitter_id: String,
        /// Ledger clock, unix seconds
        created_at: i64,
    },
    /// A status update was finalized
    StatusChanged {
        handle: SubmissionHandle,
        ledger_id: u64,
        status: GrievanceStatus,
        /// Ledger clock, unix seconds
        updated_at: i64,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::RecordCreated { .. } => EventKind::RecordCreated,
            LedgerEvent::StatusChanged { .. } => EventKind::StatusChanged,
        }
    }

    /// The correlation key shared with the local submission record
    pub fn handle(&self) -> &SubmissionHandle {
        match self {
            LedgerEvent::RecordCreated { handle, .. } => handle,
            LedgerEvent::StatusChanged { handle, .. } => handle,
        }
    }

    pub fn ledger_id(&self) -> u64 {
        match self {
            LedgerEvent::RecordCreated { ledger_id, .. } => *ledger_id,
            LedgerEvent::StatusChanged { ledger_id, .. } => *ledger_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_and_handle() {
        let event = LedgerEvent::StatusChanged {
            handle: SubmissionHandle::new("0xabc"),
            ledger_id: 3,
            status: GrievanceStatus::Acknowledged,
            updated_at: 1_700_000_000,
        };
        assert_eq!(event.kind(), EventKind::StatusChanged);
        assert_eq!(event.handle().as_str(), "0xabc");
        assert_eq!(event.ledger_id(), 3);
    }
}
