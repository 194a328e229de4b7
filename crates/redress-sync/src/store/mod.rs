//! Persistence for the synchronization engine
//!
//! Correlation records and projection rows live behind one trait because
//! they must never diverge: the optimistic insert writes both in one
//! transaction, and the projector's confirmation applies the row update,
//! the audit append, and the confirmed flag in one transaction. The
//! `confirm_*` operations are idempotent: re-applying a confirmed handle
//! performs zero writes, which is what makes at-least-once event delivery
//! safe without cross-boundary locks.

mod memory;
mod postgres;

pub use memory::MemorySyncStore;
pub use postgres::PgSyncStore;

use async_trait::async_trait;
use redress_common::{
    AuditEntry, ContentAddress, GrievanceRow, GrievanceStatus, RedressError, Sentiment,
    SubmissionHandle, SubmissionRecord,
};
use serde::Serialize;
use thiserror::Error;

/// Errors from sync store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate submission handle: {0}")]
    DuplicateHandle(SubmissionHandle),

    #[error("Grievance row {0} not found")]
    RowNotFound(i64),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for RedressError {
    fn from(err: StoreError) -> Self {
        RedressError::Storage(err.to_string())
    }
}

/// Payload for the optimistic creation insert
#[derive(Debug, Clone)]
pub struct NewGrievance {
    /// Handle returned by the ledger submit that precedes this insert
    pub handle: SubmissionHandle,
    pub submitter_row_id: i64,
    pub submitter_id: String,
    pub title: String,
    pub category: String,
    pub evidence_ref: ContentAddress,
    pub sentiment: Sentiment,
    /// Local clock, unix seconds; overwritten by the ledger clock on
    /// confirmation
    pub submitted_at: i64,
}

/// Payload for a status-update intent
#[derive(Debug, Clone)]
pub struct PendingStatusUpdate {
    pub handle: SubmissionHandle,
    pub row_id: i64,
    pub expected_status: GrievanceStatus,
    pub actor_row_id: Option<i64>,
}

/// Query filter for the list surface
#[derive(Debug, Clone, Default)]
pub struct GrievanceFilter {
    pub submitter_row_id: Option<i64>,
    pub status: Option<GrievanceStatus>,
}

/// Outcome of an idempotent confirmation
#[derive(Debug, Clone)]
pub enum Confirmation {
    /// First delivery: row updated, one audit entry appended, submission
    /// marked confirmed
    Applied(GrievanceRow),
    /// Duplicate delivery: zero writes performed
    AlreadyConfirmed,
    /// No local submission for this handle (foreign or orphaned write, or
    /// a status event racing ahead of its creation): zero writes
    UnknownHandle,
}

/// Per-administrator resolution counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub resolved: u64,
    pub rejected: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

/// Persistence contract for the synchronization engine
#[async_trait]
pub trait SyncStore: Send + Sync {
    // ── Write path ──

    /// One transaction: insert the optimistic row (null ledger id) and its
    /// `Create` submission record.
    async fn insert_grievance(&self, new: NewGrievance) -> Result<GrievanceRow, StoreError>;

    /// Record a status-update intent under its handle.
    async fn record_pending(&self, pending: PendingStatusUpdate) -> Result<(), StoreError>;

    // ── Correlation ──

    async fn resolve(
        &self,
        handle: &SubmissionHandle,
    ) -> Result<Option<SubmissionRecord>, StoreError>;

    // ── Projector confirmations (idempotent, one transaction each) ──

    /// Apply a `RecordCreated` event: set the ledger id and ledger
    /// timestamps, append the creation audit entry, mark confirmed.
    async fn confirm_creation(
        &self,
        handle: &SubmissionHandle,
        ledger_id: u64,
        created_at: i64,
    ) -> Result<Confirmation, StoreError>;

    /// Apply a `StatusChanged` event: set the new status and timestamp,
    /// append the transition audit entry, mark confirmed.
    async fn confirm_status(
        &self,
        handle: &SubmissionHandle,
        ledger_id: u64,
        status: GrievanceStatus,
        updated_at: i64,
    ) -> Result<Confirmation, StoreError>;

    /// Record the closing administrator; written by the synchronous status
    /// path on terminal transitions, never by the projector.
    async fn set_resolver(&self, row_id: i64, admin_row_id: i64) -> Result<(), StoreError>;

    // ── Queries ──

    async fn get(&self, row_id: i64) -> Result<Option<GrievanceRow>, StoreError>;

    async fn get_by_ledger_id(&self, ledger_id: u64) -> Result<Option<GrievanceRow>, StoreError>;

    /// Newest first.
    async fn list(&self, filter: GrievanceFilter) -> Result<Vec<GrievanceRow>, StoreError>;

    /// Submission records for a confirmed grievance, oldest first.
    async fn audit_trail(&self, ledger_id: u64) -> Result<Vec<SubmissionRecord>, StoreError>;

    /// Projector-written transition entries, oldest first.
    async fn audit_entries(&self, ledger_id: u64) -> Result<Vec<AuditEntry>, StoreError>;

    async fn resolution_stats(&self, admin_row_id: i64) -> Result<ResolutionStats, StoreError>;
}
