//! End-to-end tests for the synchronization engine: optimistic writes,
//! event projection, duplicate delivery, orphaned events, and the full
//! grievance lifecycle against the in-process dev ledger.

use std::sync::Arc;
use std::time::Duration;

use redress_common::{GrievanceRow, GrievanceStatus, RedressError, Sentiment};
use redress_ledger::{DevLedger, LedgerClient, MemoryEvidenceStore};
use redress_sync::{
    EventProjector, GrievanceFilter, GrievanceService, MemorySyncStore, ProjectorHandle,
    SubmitGrievance, SyncStore,
};
use tokio::time::sleep;

struct Harness {
    ledger: DevLedger,
    store: Arc<MemorySyncStore>,
    service: GrievanceService,
    projector: ProjectorHandle,
}

async fn harness() -> Harness {
    let ledger = DevLedger::new();
    let store = Arc::new(MemorySyncStore::new());
    let evidence = Arc::new(MemoryEvidenceStore::new());

    let projector = EventProjector::new(store.clone(), Arc::new(ledger.clone()));
    let handle = projector.start().await.unwrap();

    let service = GrievanceService::new(store.clone(), Arc::new(ledger.clone()), evidence);

    Harness {
        ledger,
        store,
        service,
        projector: handle,
    }
}

fn submission(title: &str) -> SubmitGrievance {
    SubmitGrievance {
        title: title.to_string(),
        category: "Infrastructure".to_string(),
        submitter_row_id: 7,
        submitter_id: "S001".to_string(),
        evidence: b"photo of the problem".to_vec(),
    }
}

async fn wait_confirmed(store: &MemorySyncStore, row_id: i64) -> GrievanceRow {
    for _ in 0..200 {
        if let Some(row) = store.get(row_id).await.unwrap() {
            if row.ledger_id.is_some() {
                return row;
            }
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("creation event was not projected within 2s");
}

async fn wait_status(store: &MemorySyncStore, row_id: i64, status: GrievanceStatus) {
    for _ in 0..200 {
        if let Some(row) = store.get(row_id).await.unwrap() {
            if row.status == status {
                return;
            }
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("status {status} was not projected within 2s");
}

#[tokio::test]
async fn optimistic_submit_confirms_after_mining() {
    let h = harness().await;

    let row = h
        .service
        .submit_grievance(submission("Hostel water leak problem"))
        .await
        .unwrap();
    assert_eq!(row.ledger_id, None, "caller sees the row before finality");
    assert_eq!(row.status, GrievanceStatus::NotProcessed);
    assert_eq!(row.sentiment, Sentiment::Negative);

    h.ledger.mine().await;
    let confirmed = wait_confirmed(&h.store, row.id).await;
    assert_eq!(confirmed.ledger_id, Some(1));

    let entries = h.store.audit_entries(1).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].from_status, None);
    assert_eq!(entries[0].to_status, GrievanceStatus::NotProcessed);

    let trail = h.service.audit_trail(1).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert!(trail[0].is_confirmed());

    h.projector.shutdown().await;
}

#[tokio::test]
async fn duplicate_delivery_applies_once() {
    let h = harness().await;

    let row = h
        .service
        .submit_grievance(submission("Library AC failure"))
        .await
        .unwrap();
    h.ledger.mine().await;
    wait_confirmed(&h.store, row.id).await;

    let trail = h.service.audit_trail(1).await.unwrap();
    let handle = trail[0].handle.clone();

    // Deliver the same finalization event twice more
    assert!(h.ledger.rebroadcast(&handle).await);
    assert!(h.ledger.rebroadcast(&handle).await);
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        h.store.audit_entries(1).await.unwrap().len(),
        1,
        "duplicates must not double-apply"
    );

    h.projector.shutdown().await;
}

#[tokio::test]
async fn foreign_event_is_skipped_without_stalling_the_feed() {
    let h = harness().await;

    // A write this instance never recorded locally (e.g. lost on restart)
    let evidence = redress_common::ContentAddress::new("b3:aa");
    h.ledger
        .submit_create("S999", "foreign write", &evidence)
        .await
        .unwrap();
    h.ledger.mine().await;

    // The listener keeps going: a local submission still projects
    let row = h
        .service
        .submit_grievance(submission("Timetable clash"))
        .await
        .unwrap();
    h.ledger.mine().await;
    let confirmed = wait_confirmed(&h.store, row.id).await;
    assert_eq!(confirmed.ledger_id, Some(2));
    assert_eq!(confirmed.sentiment, Sentiment::Neutral);

    // The foreign record never appeared in the projection
    assert!(h.store.get_by_ledger_id(1).await.unwrap().is_none());
    assert_eq!(
        h.service
            .list_grievances(GrievanceFilter::default())
            .await
            .unwrap()
            .len(),
        1
    );

    h.projector.shutdown().await;
}

#[tokio::test]
async fn full_lifecycle_walks_forward_and_records_resolver() {
    let h = harness().await;
    let miner = h.ledger.spawn_auto_mine(Duration::from_millis(20));

    let row = h
        .service
        .submit_grievance(submission("Great support from faculty"))
        .await
        .unwrap();
    let confirmed = wait_confirmed(&h.store, row.id).await;
    let ledger_id = confirmed.ledger_id.unwrap();
    assert_eq!(confirmed.sentiment, Sentiment::Positive);

    let admin = 3;
    for target in [
        GrievanceStatus::Acknowledged,
        GrievanceStatus::UnderInvestigation,
        GrievanceStatus::PendingCommitteeReview,
        GrievanceStatus::Resolved,
    ] {
        h.service
            .request_status_change(ledger_id, target, admin)
            .await
            .unwrap();
        wait_status(&h.store, row.id, target).await;
    }

    let final_row = h.store.get(row.id).await.unwrap().unwrap();
    assert_eq!(final_row.status, GrievanceStatus::Resolved);
    assert_eq!(final_row.resolved_by, Some(admin));

    // Creation plus four transitions
    let trail = h.service.audit_trail(ledger_id).await.unwrap();
    assert_eq!(trail.len(), 5);
    assert!(trail.iter().all(|record| record.is_confirmed()));
    assert_eq!(h.store.audit_entries(ledger_id).await.unwrap().len(), 5);

    // Terminal state: nothing further is accepted
    let err = h
        .service
        .request_status_change(ledger_id, GrievanceStatus::Acknowledged, admin)
        .await
        .unwrap_err();
    assert!(matches!(err, RedressError::Transition(_)));

    let stats = h.service.resolution_stats(admin).await.unwrap();
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.positive, 1);

    miner.abort();
    h.projector.shutdown().await;
}

#[tokio::test]
async fn skipping_a_step_is_rejected_before_any_io() {
    let h = harness().await;

    let row = h
        .service
        .submit_grievance(submission("Slow grievance redressal itself"))
        .await
        .unwrap();
    h.ledger.mine().await;
    let confirmed = wait_confirmed(&h.store, row.id).await;
    let ledger_id = confirmed.ledger_id.unwrap();

    let err = h
        .service
        .request_status_change(ledger_id, GrievanceStatus::Resolved, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RedressError::Transition(_)));

    // Rejected before submit: no pending intent was recorded
    assert_eq!(h.service.audit_trail(ledger_id).await.unwrap().len(), 1);

    h.projector.shutdown().await;
}

#[tokio::test]
async fn status_change_requires_a_confirmed_row() {
    let h = harness().await;

    let err = h
        .service
        .request_status_change(42, GrievanceStatus::Acknowledged, 3)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RedressError::Ledger(redress_common::LedgerError::RecordNotFound(42))
    ));

    h.projector.shutdown().await;
}

#[tokio::test]
async fn ledger_outage_leaves_no_local_trace() {
    let h = harness().await;
    h.ledger.set_offline(true).await;

    let err = h
        .service
        .submit_grievance(submission("Hostel mess timings"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RedressError::Ledger(redress_common::LedgerError::Unavailable(_))
    ));

    assert!(h
        .service
        .list_grievances(GrievanceFilter::default())
        .await
        .unwrap()
        .is_empty());

    h.projector.shutdown().await;
}

#[tokio::test]
async fn detail_reads_through_to_the_ledger() {
    let h = harness().await;

    let row = h
        .service
        .submit_grievance(submission("Exam results delayed"))
        .await
        .unwrap();
    h.ledger.mine().await;
    let confirmed = wait_confirmed(&h.store, row.id).await;
    let ledger_id = confirmed.ledger_id.unwrap();

    let record = h.service.get_detail(ledger_id).await.unwrap();
    assert_eq!(record.ledger_id, Some(ledger_id));
    assert_eq!(record.title, "Exam results delayed");
    assert_eq!(record.status, GrievanceStatus::NotProcessed);

    let missing = h.service.get_detail(999).await.unwrap_err();
    assert!(matches!(
        missing,
        RedressError::Ledger(redress_common::LedgerError::RecordNotFound(999))
    ));

    h.projector.shutdown().await;
}
