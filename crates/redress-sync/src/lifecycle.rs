//! Grievance lifecycle state machine
//!
//! Pure decision component, no I/O. The forward chain is strictly
//! sequential; `Rejected` is reachable from every non-terminal state;
//! `Resolved` and `Rejected` admit no outgoing transitions. Skipping a
//! forward step and identity transitions are both invalid.

use redress_common::{GrievanceStatus, TransitionError};

/// The next state in the forward chain, if any
pub fn next_forward(status: GrievanceStatus) -> Option<GrievanceStatus> {
    match status {
        GrievanceStatus::NotProcessed => Some(GrievanceStatus::Acknowledged),
        GrievanceStatus::Acknowledged => Some(GrievanceStatus::UnderInvestigation),
        GrievanceStatus::UnderInvestigation => Some(GrievanceStatus::PendingCommitteeReview),
        GrievanceStatus::PendingCommitteeReview => Some(GrievanceStatus::Resolved),
        GrievanceStatus::Resolved | GrievanceStatus::Rejected => None,
    }
}

/// Decide whether `current -> requested` is a legal transition
pub fn validate_transition(
    current: GrievanceStatus,
    requested: GrievanceStatus,
) -> Result<(), TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::Terminal { status: current });
    }
    if requested == GrievanceStatus::Rejected {
        return Ok(());
    }
    if next_forward(current) == Some(requested) {
        return Ok(());
    }
    Err(TransitionError::Invalid {
        from: current,
        to: requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use GrievanceStatus::*;

    /// The eight legal pairs: four forward edges plus rejection from each
    /// non-terminal state.
    const LEGAL: [(GrievanceStatus, GrievanceStatus); 8] = [
        (NotProcessed, Acknowledged),
        (Acknowledged, UnderInvestigation),
        (UnderInvestigation, PendingCommitteeReview),
        (PendingCommitteeReview, Resolved),
        (NotProcessed, Rejected),
        (Acknowledged, Rejected),
        (UnderInvestigation, Rejected),
        (PendingCommitteeReview, Rejected),
    ];

    #[test]
    fn test_exhaustive_transition_matrix() {
        for from in GrievanceStatus::ALL {
            for to in GrievanceStatus::ALL {
                let verdict = validate_transition(from, to);
                if LEGAL.contains(&(from, to)) {
                    assert!(verdict.is_ok(), "{from} -> {to} should be legal");
                } else {
                    assert!(verdict.is_err(), "{from} -> {to} should be rejected");
                }
            }
        }
    }

    #[test]
    fn test_skipping_a_step_is_invalid() {
        assert_eq!(
            validate_transition(NotProcessed, UnderInvestigation),
            Err(TransitionError::Invalid {
                from: NotProcessed,
                to: UnderInvestigation,
            })
        );
        assert_eq!(
            validate_transition(Acknowledged, Resolved),
            Err(TransitionError::Invalid {
                from: Acknowledged,
                to: Resolved,
            })
        );
    }

    #[test]
    fn test_identity_is_invalid() {
        for status in GrievanceStatus::ALL {
            assert!(validate_transition(status, status).is_err());
        }
    }

    #[test]
    fn test_terminal_states_are_closed() {
        for to in GrievanceStatus::ALL {
            assert_eq!(
                validate_transition(Resolved, to),
                Err(TransitionError::Terminal { status: Resolved })
            );
            assert_eq!(
                validate_transition(Rejected, to),
                Err(TransitionError::Terminal { status: Rejected })
            );
        }
    }

    #[test]
    fn test_forward_chain_walks_to_resolved() {
        let mut status = NotProcessed;
        let mut steps = 0;
        while let Some(next) = next_forward(status) {
            assert!(validate_transition(status, next).is_ok());
            status = next;
            steps += 1;
        }
        assert_eq!(status, Resolved);
        assert_eq!(steps, 4);
    }
}
