//! In-memory sync store
//!
//! One mutex over the whole table set gives the same all-or-nothing
//! semantics as the Postgres backend's transactions. Used by tests and
//! local runs without a database.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use redress_common::{
    AuditEntry, ConfirmationState, GrievanceRow, GrievanceStatus, Sentiment, SubmissionHandle,
    SubmissionKind, SubmissionRecord,
};

use super::{
    Confirmation, GrievanceFilter, NewGrievance, PendingStatusUpdate, ResolutionStats, StoreError,
    SyncStore,
};

#[derive(Default)]
struct Tables {
    next_row_id: i64,
    next_audit_id: i64,
    grievances: BTreeMap<i64, GrievanceRow>,
    /// ledger id -> internal row id; enforces ledger-id uniqueness
    ledger_index: HashMap<u64, i64>,
    submissions: HashMap<SubmissionHandle, SubmissionRecord>,
    /// Insertion order of submissions, for the ordered audit trail
    submission_order: Vec<SubmissionHandle>,
    audit: Vec<AuditEntry>,
}

/// In-memory implementation of [`SyncStore`]
pub struct MemorySyncStore {
    tables: Mutex<Tables>,
}

impl MemorySyncStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }
}

impl Default for MemorySyncStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncStore for MemorySyncStore {
    async fn insert_grievance(&self, new: NewGrievance) -> Result<GrievanceRow, StoreError> {
        let mut tables = self.tables.lock();
        if tables.submissions.contains_key(&new.handle) {
            return Err(StoreError::DuplicateHandle(new.handle));
        }

        tables.next_row_id += 1;
        let row_id = tables.next_row_id;
        let row = GrievanceRow {
            id: row_id,
            ledger_id: None,
            submitter_row_id: new.submitter_row_id,
            submitter_id: new.submitter_id,
            title: new.title,
            category: new.category,
            evidence_ref: new.evidence_ref,
            status: GrievanceStatus::NotProcessed,
            sentiment: new.sentiment,
            resolved_by: None,
            created_at: new.submitted_at,
            updated_at: new.submitted_at,
        };
        tables.grievances.insert(row_id, row.clone());

        let record = SubmissionRecord {
            handle: new.handle.clone(),
            kind: SubmissionKind::Create,
            row_id,
            expected_status: GrievanceStatus::NotProcessed,
            actor_row_id: None,
            state: ConfirmationState::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
        };
        tables.submissions.insert(new.handle.clone(), record);
        tables.submission_order.push(new.handle);

        Ok(row)
    }

    async fn record_pending(&self, pending: PendingStatusUpdate) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if tables.submissions.contains_key(&pending.handle) {
            return Err(StoreError::DuplicateHandle(pending.handle));
        }
        if !tables.grievances.contains_key(&pending.row_id) {
            return Err(StoreError::RowNotFound(pending.row_id));
        }

        let record = SubmissionRecord {
            handle: pending.handle.clone(),
            kind: SubmissionKind::StatusUpdate,
            row_id: pending.row_id,
            expected_status: pending.expected_status,
            actor_row_id: pending.actor_row_id,
            state: ConfirmationState::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
        };
        tables.submissions.insert(pending.handle.clone(), record);
        tables.submission_order.push(pending.handle);
        Ok(())
    }

    async fn resolve(
        &self,
        handle: &SubmissionHandle,
    ) -> Result<Option<SubmissionRecord>, StoreError> {
        Ok(self.tables.lock().submissions.get(handle).cloned())
    }

    async fn confirm_creation(
        &self,
        handle: &SubmissionHandle,
        ledger_id: u64,
        created_at: i64,
    ) -> Result<Confirmation, StoreError> {
        let mut tables = self.tables.lock();

        let Some(submission) = tables.submissions.get(handle).cloned() else {
            return Ok(Confirmation::UnknownHandle);
        };
        if submission.state == ConfirmationState::Confirmed {
            return Ok(Confirmation::AlreadyConfirmed);
        }
        if submission.kind != SubmissionKind::Create {
            // Creation event against a status handle is never ours to apply
            return Ok(Confirmation::UnknownHandle);
        }

        if let Some(&other) = tables.ledger_index.get(&ledger_id) {
            if other != submission.row_id {
                return Err(StoreError::Database(format!(
                    "ledger id {ledger_id} already projected onto row {other}"
                )));
            }
        }

        let row_id = submission.row_id;
        let row = tables
            .grievances
            .get_mut(&row_id)
            .ok_or(StoreError::RowNotFound(row_id))?;
        row.ledger_id = Some(ledger_id);
        row.created_at = created_at;
        row.updated_at = created_at;
        let status = row.status;
        let snapshot = row.clone();

        tables.ledger_index.insert(ledger_id, row_id);
        tables.next_audit_id += 1;
        let audit_id = tables.next_audit_id;
        tables.audit.push(AuditEntry {
            id: audit_id,
            row_id,
            ledger_id,
            from_status: None,
            to_status: status,
            handle: handle.clone(),
            recorded_at: Utc::now(),
        });

        let submission = tables
            .submissions
            .get_mut(handle)
            .expect("submission present above");
        submission.state = ConfirmationState::Confirmed;
        submission.confirmed_at = Some(Utc::now());

        Ok(Confirmation::Applied(snapshot))
    }

    async fn confirm_status(
        &self,
        handle: &SubmissionHandle,
        ledger_id: u64,
        status: GrievanceStatus,
        updated_at: i64,
    ) -> Result<Confirmation, StoreError> {
        let mut tables = self.tables.lock();

        let Some(submission) = tables.submissions.get(handle).cloned() else {
            return Ok(Confirmation::UnknownHandle);
        };
        if submission.state == ConfirmationState::Confirmed {
            return Ok(Confirmation::AlreadyConfirmed);
        }
        if submission.kind != SubmissionKind::StatusUpdate {
            return Ok(Confirmation::UnknownHandle);
        }

        let row_id = submission.row_id;
        let row = tables
            .grievances
            .get_mut(&row_id)
            .ok_or(StoreError::RowNotFound(row_id))?;
        if row.ledger_id.is_none() {
            // Status event racing ahead of its record's creation event:
            // leave the submission pending and skip
            return Ok(Confirmation::UnknownHandle);
        }

        let from = row.status;
        row.status = status;
        row.updated_at = updated_at;
        let snapshot = row.clone();

        tables.next_audit_id += 1;
        let audit_id = tables.next_audit_id;
        tables.audit.push(AuditEntry {
            id: audit_id,
            row_id,
            ledger_id,
            from_status: Some(from),
            to_status: status,
            handle: handle.clone(),
            recorded_at: Utc::now(),
        });

        let submission = tables
            .submissions
            .get_mut(handle)
            .expect("submission present above");
        submission.state = ConfirmationState::Confirmed;
        submission.confirmed_at = Some(Utc::now());

        Ok(Confirmation::Applied(snapshot))
    }

    async fn set_resolver(&self, row_id: i64, admin_row_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let row = tables
            .grievances
            .get_mut(&row_id)
            .ok_or(StoreError::RowNotFound(row_id))?;
        row.resolved_by = Some(admin_row_id);
        Ok(())
    }

    async fn get(&self, row_id: i64) -> Result<Option<GrievanceRow>, StoreError> {
        Ok(self.tables.lock().grievances.get(&row_id).cloned())
    }

    async fn get_by_ledger_id(&self, ledger_id: u64) -> Result<Option<GrievanceRow>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .ledger_index
            .get(&ledger_id)
            .and_then(|row_id| tables.grievances.get(row_id))
            .cloned())
    }

    async fn list(&self, filter: GrievanceFilter) -> Result<Vec<GrievanceRow>, StoreError> {
        let tables = self.tables.lock();
        let mut rows: Vec<GrievanceRow> = tables
            .grievances
            .values()
            .filter(|row| {
                filter
                    .submitter_row_id
                    .map_or(true, |id| row.submitter_row_id == id)
                    && filter.status.map_or(true, |status| row.status == status)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn audit_trail(&self, ledger_id: u64) -> Result<Vec<SubmissionRecord>, StoreError> {
        let tables = self.tables.lock();
        let Some(&row_id) = tables.ledger_index.get(&ledger_id) else {
            return Ok(Vec::new());
        };
        Ok(tables
            .submission_order
            .iter()
            .filter_map(|handle| tables.submissions.get(handle))
            .filter(|record| record.row_id == row_id)
            .cloned()
            .collect())
    }

    async fn audit_entries(&self, ledger_id: u64) -> Result<Vec<AuditEntry>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .audit
            .iter()
            .filter(|entry| entry.ledger_id == ledger_id)
            .cloned()
            .collect())
    }

    async fn resolution_stats(&self, admin_row_id: i64) -> Result<ResolutionStats, StoreError> {
        let tables = self.tables.lock();
        let mut stats = ResolutionStats::default();
        for row in tables.grievances.values() {
            if row.resolved_by != Some(admin_row_id) {
                continue;
            }
            match row.status {
                GrievanceStatus::Resolved => stats.resolved += 1,
                GrievanceStatus::Rejected => stats.rejected += 1,
                _ => {}
            }
            match row.sentiment {
                Sentiment::Positive => stats.positive += 1,
                Sentiment::Negative => stats.negative += 1,
                Sentiment::Neutral => stats.neutral += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redress_common::ContentAddress;

    fn new_grievance(handle: &str) -> NewGrievance {
        NewGrievance {
            handle: SubmissionHandle::new(handle),
            submitter_row_id: 7,
            submitter_id: "S001".into(),
            title: "Hostel water leak problem".into(),
            category: "Hostel".into(),
            evidence_ref: ContentAddress::new("b3:00"),
            sentiment: Sentiment::Negative,
            submitted_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_optimistic_insert_and_resolve() {
        let store = MemorySyncStore::new();
        let row = store.insert_grievance(new_grievance("0xa")).await.unwrap();
        assert_eq!(row.ledger_id, None);
        assert_eq!(row.status, GrievanceStatus::NotProcessed);

        let record = store
            .resolve(&SubmissionHandle::new("0xa"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, SubmissionKind::Create);
        assert_eq!(record.row_id, row.id);
        assert!(!record.is_confirmed());
    }

    #[tokio::test]
    async fn test_duplicate_handle_rejected() {
        let store = MemorySyncStore::new();
        store.insert_grievance(new_grievance("0xa")).await.unwrap();
        let err = store
            .insert_grievance(new_grievance("0xa"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHandle(_)));
    }

    #[tokio::test]
    async fn test_confirm_creation_is_idempotent() {
        let store = MemorySyncStore::new();
        let handle = SubmissionHandle::new("0xa");
        store.insert_grievance(new_grievance("0xa")).await.unwrap();

        let first = store
            .confirm_creation(&handle, 1, 1_700_000_100)
            .await
            .unwrap();
        let row = match first {
            Confirmation::Applied(row) => row,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(row.ledger_id, Some(1));
        assert_eq!(row.created_at, 1_700_000_100);

        let second = store
            .confirm_creation(&handle, 1, 1_700_000_100)
            .await
            .unwrap();
        assert!(matches!(second, Confirmation::AlreadyConfirmed));

        // Exactly one audit entry survives the duplicate delivery
        assert_eq!(store.audit_entries(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_handle_performs_zero_writes() {
        let store = MemorySyncStore::new();
        let outcome = store
            .confirm_status(&SubmissionHandle::new("0xdead"), 1, GrievanceStatus::Acknowledged, 0)
            .await
            .unwrap();
        assert!(matches!(outcome, Confirmation::UnknownHandle));
        assert!(store.audit_entries(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_event_before_creation_is_skipped() {
        let store = MemorySyncStore::new();
        let row = store.insert_grievance(new_grievance("0xa")).await.unwrap();
        store
            .record_pending(PendingStatusUpdate {
                handle: SubmissionHandle::new("0xb"),
                row_id: row.id,
                expected_status: GrievanceStatus::Acknowledged,
                actor_row_id: Some(1),
            })
            .await
            .unwrap();

        // Creation not yet projected: the row has no ledger id
        let outcome = store
            .confirm_status(&SubmissionHandle::new("0xb"), 1, GrievanceStatus::Acknowledged, 0)
            .await
            .unwrap();
        assert!(matches!(outcome, Confirmation::UnknownHandle));

        // Still pending, so an equivalent redelivery can apply it later
        let record = store
            .resolve(&SubmissionHandle::new("0xb"))
            .await
            .unwrap()
            .unwrap();
        assert!(!record.is_confirmed());
    }

    #[tokio::test]
    async fn test_status_confirmation_appends_transition() {
        let store = MemorySyncStore::new();
        let row = store.insert_grievance(new_grievance("0xa")).await.unwrap();
        store
            .confirm_creation(&SubmissionHandle::new("0xa"), 1, 1_700_000_100)
            .await
            .unwrap();
        store
            .record_pending(PendingStatusUpdate {
                handle: SubmissionHandle::new("0xb"),
                row_id: row.id,
                expected_status: GrievanceStatus::Acknowledged,
                actor_row_id: Some(3),
            })
            .await
            .unwrap();

        let outcome = store
            .confirm_status(
                &SubmissionHandle::new("0xb"),
                1,
                GrievanceStatus::Acknowledged,
                1_700_000_200,
            )
            .await
            .unwrap();
        let updated = match outcome {
            Confirmation::Applied(row) => row,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(updated.status, GrievanceStatus::Acknowledged);
        assert_eq!(updated.updated_at, 1_700_000_200);

        let entries = store.audit_entries(1).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].from_status, Some(GrievanceStatus::NotProcessed));
        assert_eq!(entries[1].to_status, GrievanceStatus::Acknowledged);

        let trail = store.audit_trail(1).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].kind, SubmissionKind::Create);
        assert_eq!(trail[1].kind, SubmissionKind::StatusUpdate);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_confirmations() {
        let store = std::sync::Arc::new(MemorySyncStore::new());
        store.insert_grievance(new_grievance("0xabc")).await.unwrap();
        let handle = SubmissionHandle::new("0xabc");

        let (a, b) = tokio::join!(
            store.confirm_creation(&handle, 1, 1_700_000_100),
            store.confirm_creation(&handle, 1, 1_700_000_100),
        );
        let applied = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|c| matches!(c, Confirmation::Applied(_)))
            .count();
        assert_eq!(applied, 1);
        assert_eq!(store.audit_entries(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let store = MemorySyncStore::new();
        let first = store.insert_grievance(new_grievance("0xa")).await.unwrap();
        let mut other = new_grievance("0xb");
        other.submitter_row_id = 8;
        let second = store.insert_grievance(other).await.unwrap();

        let all = store.list(GrievanceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id, "newest first");

        let mine = store
            .list(GrievanceFilter {
                submitter_row_id: Some(7),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first.id);
    }

    #[tokio::test]
    async fn test_resolution_stats() {
        let store = MemorySyncStore::new();
        let row = store.insert_grievance(new_grievance("0xa")).await.unwrap();
        store
            .confirm_creation(&SubmissionHandle::new("0xa"), 1, 0)
            .await
            .unwrap();
        store
            .record_pending(PendingStatusUpdate {
                handle: SubmissionHandle::new("0xb"),
                row_id: row.id,
                expected_status: GrievanceStatus::Rejected,
                actor_row_id: Some(3),
            })
            .await
            .unwrap();
        store
            .confirm_status(&SubmissionHandle::new("0xb"), 1, GrievanceStatus::Rejected, 1)
            .await
            .unwrap();
        store.set_resolver(row.id, 3).await.unwrap();

        let stats = store.resolution_stats(3).await.unwrap();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.resolved, 0);
        assert_eq!(stats.negative, 1);

        assert_eq!(store.resolution_stats(99).await.unwrap(), ResolutionStats::default());
    }
}
