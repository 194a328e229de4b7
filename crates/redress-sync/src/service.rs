//! GrievanceService - write path and query surface
//!
//! Creation is optimistic: the caller gets the projection row back as soon
//! as the ledger accepts the write into its pending pool, with the ledger
//! id still null. Status changes give the stronger guarantee: the call
//! returns only after the ledger finalizes the update.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use redress_common::{
    GrievanceRecord, GrievanceRow, GrievanceStatus, LedgerError, RedressError, Result, Sentiment,
    SubmissionHandle, SubmissionRecord, ValidationError, SUBMIT_TIMEOUT_MS,
};
use redress_ledger::{EvidenceStore, LedgerClient};
use tracing::{info, instrument};

use crate::lifecycle::validate_transition;
use crate::store::{
    GrievanceFilter, NewGrievance, PendingStatusUpdate, ResolutionStats, SyncStore,
};

/// A grievance submission from the API layer
#[derive(Debug, Clone)]
pub struct SubmitGrievance {
    pub title: String,
    pub category: String,
    pub submitter_row_id: i64,
    pub submitter_id: String,
    pub evidence: Vec<u8>,
}

/// Write path and query surface exposed to the API layer
pub struct GrievanceService {
    store: Arc<dyn SyncStore>,
    ledger: Arc<dyn LedgerClient>,
    evidence: Arc<dyn EvidenceStore>,
    submit_timeout: Duration,
}

impl GrievanceService {
    pub fn new(
        store: Arc<dyn SyncStore>,
        ledger: Arc<dyn LedgerClient>,
        evidence: Arc<dyn EvidenceStore>,
    ) -> Self {
        Self {
            store,
            ledger,
            evidence,
            submit_timeout: Duration::from_millis(SUBMIT_TIMEOUT_MS),
        }
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Lodge a grievance: evidence first, then the ledger submit, then the
    /// optimistic local insert. The returned row has no ledger id yet.
    ///
    /// A ledger failure writes nothing locally. A local failure after a
    /// successful submit orphans the write on the ledger; its eventual
    /// creation event resolves to no known handle and is skipped.
    #[instrument(skip(self, request), fields(submitter = %request.submitter_id))]
    pub async fn submit_grievance(&self, request: SubmitGrievance) -> Result<GrievanceRow> {
        if request.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title").into());
        }
        if request.category.trim().is_empty() {
            return Err(ValidationError::MissingField("category").into());
        }
        if request.evidence.is_empty() {
            return Err(ValidationError::MissingField("evidence").into());
        }

        let evidence_ref = self.evidence.store(&request.evidence).await?;
        let sentiment = Sentiment::classify(&request.title);

        let handle = self
            .bounded(self.ledger.submit_create(
                &request.submitter_id,
                &request.title,
                &evidence_ref,
            ))
            .await?;

        let row = self
            .store
            .insert_grievance(NewGrievance {
                handle: handle.clone(),
                submitter_row_id: request.submitter_row_id,
                submitter_id: request.submitter_id,
                title: request.title,
                category: request.category,
                evidence_ref,
                sentiment,
                submitted_at: Utc::now().timestamp(),
            })
            .await?;

        info!(row_id = row.id, %handle, "grievance lodged optimistically");
        Ok(row)
    }

    /// Projection rows, newest first
    pub async fn list_grievances(&self, filter: GrievanceFilter) -> Result<Vec<GrievanceRow>> {
        Ok(self.store.list(filter).await?)
    }

    /// Authoritative detail, read through to the ledger
    pub async fn get_detail(&self, ledger_id: u64) -> Result<GrievanceRecord> {
        Ok(self.ledger.fetch_record(ledger_id).await?)
    }

    /// Request a status transition and wait for ledger finality.
    ///
    /// Validation happens before any I/O. The projector remains the sole
    /// writer of ledger-confirmed fields; this path only records the
    /// pending intent and, on terminal transitions, the resolving
    /// administrator.
    #[instrument(skip(self))]
    pub async fn request_status_change(
        &self,
        ledger_id: u64,
        target: GrievanceStatus,
        actor_row_id: i64,
    ) -> Result<()> {
        let row = self
            .store
            .get_by_ledger_id(ledger_id)
            .await?
            .ok_or(RedressError::Ledger(LedgerError::RecordNotFound(ledger_id)))?;

        validate_transition(row.status, target)?;

        let handle = self
            .bounded(self.ledger.submit_status_update(ledger_id, target))
            .await?;

        self.store
            .record_pending(PendingStatusUpdate {
                handle: handle.clone(),
                row_id: row.id,
                expected_status: target,
                actor_row_id: Some(actor_row_id),
            })
            .await?;

        self.ledger.wait_finalized(&handle).await?;

        if target.is_terminal() {
            self.store.set_resolver(row.id, actor_row_id).await?;
        }

        info!(ledger_id, %target, %handle, "status update finalized");
        Ok(())
    }

    /// Submission records for a confirmed grievance, oldest first
    pub async fn audit_trail(&self, ledger_id: u64) -> Result<Vec<SubmissionRecord>> {
        self.store
            .get_by_ledger_id(ledger_id)
            .await?
            .ok_or(RedressError::Ledger(LedgerError::RecordNotFound(ledger_id)))?;
        Ok(self.store.audit_trail(ledger_id).await?)
    }

    /// Resolution counters for one administrator
    pub async fn resolution_stats(&self, admin_row_id: i64) -> Result<ResolutionStats> {
        Ok(self.store.resolution_stats(admin_row_id).await?)
    }

    /// Bound a ledger submit with the configured timeout; expiry surfaces
    /// as `Unavailable` and is never retried here
    async fn bounded<F>(&self, submit: F) -> Result<SubmissionHandle>
    where
        F: Future<Output = std::result::Result<SubmissionHandle, LedgerError>>,
    {
        match tokio::time::timeout(self.submit_timeout, submit).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(LedgerError::Unavailable(format!(
                "submit timed out after {}ms",
                self.submit_timeout.as_millis()
            ))
            .into()),
        }
    }
}
