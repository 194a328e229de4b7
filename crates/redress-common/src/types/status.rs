//! GrievanceStatus - the six-state grievance lifecycle
//!
//! The numeric codes are the ledger's stable wire encoding and must not be
//! reordered. The forward chain is strictly sequential; `Rejected` is
//! reachable from any non-terminal state. Transition legality lives in the
//! synchronization engine's state machine, not here.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a grievance, with stable numeric encoding 0-5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrievanceStatus {
    /// Freshly lodged, not yet looked at
    NotProcessed,
    /// An administrator has acknowledged receipt
    Acknowledged,
    /// Actively being investigated
    UnderInvestigation,
    /// Escalated, awaiting the committee's decision
    PendingCommitteeReview,
    /// Closed with a resolution (terminal)
    Resolved,
    /// Closed without a resolution (terminal)
    Rejected,
}

impl GrievanceStatus {
    /// All states in code order
    pub const ALL: [GrievanceStatus; 6] = [
        GrievanceStatus::NotProcessed,
        GrievanceStatus::Acknowledged,
        GrievanceStatus::UnderInvestigation,
        GrievanceStatus::PendingCommitteeReview,
        GrievanceStatus::Resolved,
        GrievanceStatus::Rejected,
    ];

    /// Stable numeric code used on the ledger
    pub fn code(self) -> u8 {
        match self {
            GrievanceStatus::NotProcessed => 0,
            GrievanceStatus::Acknowledged => 1,
            GrievanceStatus::UnderInvestigation => 2,
            GrievanceStatus::PendingCommitteeReview => 3,
            GrievanceStatus::Resolved => 4,
            GrievanceStatus::Rejected => 5,
        }
    }

    /// Decode a ledger status code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, GrievanceStatus::Resolved | GrievanceStatus::Rejected)
    }

    /// Human-readable label, matching the relational store's enum values
    pub fn label(self) -> &'static str {
        match self {
            GrievanceStatus::NotProcessed => "Not Processed",
            GrievanceStatus::Acknowledged => "Acknowledged",
            GrievanceStatus::UnderInvestigation => "Under Investigation",
            GrievanceStatus::PendingCommitteeReview => "Pending Committee Review",
            GrievanceStatus::Resolved => "Resolved",
            GrievanceStatus::Rejected => "Rejected",
        }
    }

    /// Parse a human-readable label back into a status
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

impl std::fmt::Display for GrievanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
