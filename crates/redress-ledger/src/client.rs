//! LedgerClient - typed wrapper over the external ledger
//!
//! The ledger is a trusted external collaborator: it finalizes submitted
//! writes on its own schedule and emits one event per finalization. Submit
//! calls return as soon as the write enters the pending pool; only the
//! status-update path waits for finality before returning to its caller.

use async_trait::async_trait;
use redress_common::{ContentAddress, GrievanceRecord, GrievanceStatus, LedgerError, SubmissionHandle};
use tokio::sync::mpsc;

use crate::events::{EventKind, LedgerEvent};

/// Typed client for the external ledger
///
/// Failure contract: `submit_*` fail with [`LedgerError::Unavailable`]
/// (transient, nothing changed on either side) or
/// [`LedgerError::Rejected`] (permanent for that request).
/// `fetch_record` fails with [`LedgerError::RecordNotFound`] for an
/// unknown identifier.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a creation write. Returns once the ledger accepts it into
    /// the pending pool; the numeric id is only known from the eventual
    /// `RecordCreated` event.
    async fn submit_create(
        &self,
        submitter_id: &str,
        title: &str,
        evidence_ref: &ContentAddress,
    ) -> Result<SubmissionHandle, LedgerError>;

    /// Submit a status update against a finalized record.
    async fn submit_status_update(
        &self,
        ledger_id: u64,
        target: GrievanceStatus,
    ) -> Result<SubmissionHandle, LedgerError>;

    /// Authoritative read of current finalized state, bypassing the cache.
    async fn fetch_record(&self, ledger_id: u64) -> Result<GrievanceRecord, LedgerError>;

    /// Open one persistent event feed for `kind`. Events arrive
    /// at-least-once, in emission order for that kind.
    async fn subscribe(&self, kind: EventKind) -> Result<mpsc::Receiver<LedgerEvent>, LedgerError>;

    /// Block until the submission identified by `handle` is finalized.
    async fn wait_finalized(&self, handle: &SubmissionHandle) -> Result<(), LedgerError>;
}
