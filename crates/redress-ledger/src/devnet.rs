//! DevLedger - deterministic in-process ledger
//!
//! Stands in for the external chain in tests and local development. Writes
//! land in an explicit pending pool and stay there until [`DevLedger::mine`]
//! finalizes them, assigns sequential numeric ids, and emits events to
//! every subscriber. `rebroadcast` re-emits an already-finalized event so
//! tests can exercise the at-least-once delivery contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use redress_common::{
    ContentAddress, GrievanceRecord, GrievanceStatus, LedgerError, SubmissionHandle,
};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::LedgerClient;
use crate::events::{EventKind, LedgerEvent};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A write sitting in the pending pool
#[derive(Debug, Clone)]
enum PendingWrite {
    Create {
        handle: SubmissionHandle,
        submitter_id: String,
        title: String,
        evidence_ref: ContentAddress,
    },
    StatusUpdate {
        handle: SubmissionHandle,
        ledger_id: u64,
        target: GrievanceStatus,
    },
}

/// A finalized record; index + 1 is its ledger id
#[derive(Debug, Clone)]
struct StoredRecord {
    submitter_id: String,
    title: String,
    evidence_ref: ContentAddress,
    status: GrievanceStatus,
    created_at: i64,
    last_updated_at: i64,
}

#[derive(Default)]
struct LedgerState {
    records: Vec<StoredRecord>,
    pending: Vec<PendingWrite>,
    /// Finalized events by handle, kept for rebroadcast and finality waits
    finalized: HashMap<SubmissionHandle, LedgerEvent>,
    subscribers: HashMap<EventKind, Vec<mpsc::Sender<LedgerEvent>>>,
    offline: bool,
}

/// In-process ledger with explicit mining
#[derive(Clone)]
pub struct DevLedger {
    state: Arc<Mutex<LedgerState>>,
    mined: Arc<Notify>,
}

impl DevLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            mined: Arc::new(Notify::new()),
        }
    }

    /// Simulate the ledger endpoint going away; submits fail with
    /// `Unavailable` until switched back.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Finalize every pending write in submission order, assigning
    /// sequential numeric ids, and emit one event per write.
    pub async fn mine(&self) -> usize {
        let (events, senders) = {
            let mut state = self.state.lock().await;
            let drained: Vec<PendingWrite> = state.pending.drain(..).collect();
            let now = Utc::now().timestamp();
            let mut events = Vec::with_capacity(drained.len());

            for write in drained {
                match write {
                    PendingWrite::Create {
                        handle,
                        submitter_id,
                        title,
                        evidence_ref,
                    } => {
                        state.records.push(StoredRecord {
                            submitter_id: submitter_id.clone(),
                            title,
                            evidence_ref,
                            status: GrievanceStatus::NotProcessed,
                            created_at: now,
                            last_updated_at: now,
                        });
                        let ledger_id = state.records.len() as u64;
                        let event = LedgerEvent::RecordCreated {
                            handle: handle.clone(),
                            ledger_id,
                            submitter_id,
                            created_at: now,
                        };
                        state.finalized.insert(handle, event.clone());
                        events.push(event);
                    }
                    PendingWrite::StatusUpdate {
                        handle,
                        ledger_id,
                        target,
                    } => {
                        let Some(record) = state.records.get_mut(ledger_id as usize - 1) else {
                            warn!(%handle, ledger_id, "pending status update targets unknown record, dropping");
                            continue;
                        };
                        record.status = target;
                        record.last_updated_at = now;
                        let event = LedgerEvent::StatusChanged {
                            handle: handle.clone(),
                            ledger_id,
                            status: target,
                            updated_at: now,
                        };
                        state.finalized.insert(handle, event.clone());
                        events.push(event);
                    }
                }
            }

            let senders = state.subscribers.clone();
            (events, senders)
        };

        let count = events.len();
        for event in &events {
            self.dispatch(&senders, event).await;
        }
        if count > 0 {
            debug!(count, "mined pending writes");
        }
        self.mined.notify_waiters();
        count
    }

    /// Re-emit an already-finalized event, simulating duplicate delivery.
    pub async fn rebroadcast(&self, handle: &SubmissionHandle) -> bool {
        let (event, senders) = {
            let state = self.state.lock().await;
            match state.finalized.get(handle) {
                Some(event) => (event.clone(), state.subscribers.clone()),
                None => return false,
            }
        };
        self.dispatch(&senders, &event).await;
        true
    }

    /// Spawn a background task that mines on a fixed interval, for local
    /// runs where nothing drives `mine()` explicitly.
    pub fn spawn_auto_mine(&self, interval: Duration) -> JoinHandle<()> {
        let ledger = self.clone();
        tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "dev ledger auto-mine running");
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                ledger.mine().await;
            }
        })
    }

    async fn dispatch(
        &self,
        senders: &HashMap<EventKind, Vec<mpsc::Sender<LedgerEvent>>>,
        event: &LedgerEvent,
    ) {
        if let Some(subscribers) = senders.get(&event.kind()) {
            for sender in subscribers {
                // A dropped receiver is an unsubscribed listener, not an error
                let _ = sender.send(event.clone()).await;
            }
        }
    }

    fn mint_handle() -> SubmissionHandle {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        SubmissionHandle::new(format!("0x{}", hex::encode(bytes)))
    }
}

impl Default for DevLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for DevLedger {
    async fn submit_create(
        &self,
        submitter_id: &str,
        title: &str,
        evidence_ref: &ContentAddress,
    ) -> Result<SubmissionHandle, LedgerError> {
        let mut state = self.state.lock().await;
        if state.offline {
            return Err(LedgerError::Unavailable("dev ledger offline".into()));
        }
        let handle = Self::mint_handle();
        state.pending.push(PendingWrite::Create {
            handle: handle.clone(),
            submitter_id: submitter_id.to_string(),
            title: title.to_string(),
            evidence_ref: evidence_ref.clone(),
        });
        debug!(%handle, submitter_id, "creation accepted into pending pool");
        Ok(handle)
    }

    async fn submit_status_update(
        &self,
        ledger_id: u64,
        target: GrievanceStatus,
    ) -> Result<SubmissionHandle, LedgerError> {
        let mut state = self.state.lock().await;
        if state.offline {
            return Err(LedgerError::Unavailable("dev ledger offline".into()));
        }
        if ledger_id == 0 || ledger_id as usize > state.records.len() {
            return Err(LedgerError::Rejected(format!(
                "status update targets unknown record {ledger_id}"
            )));
        }
        let handle = Self::mint_handle();
        state.pending.push(PendingWrite::StatusUpdate {
            handle: handle.clone(),
            ledger_id,
            target,
        });
        debug!(%handle, ledger_id, %target, "status update accepted into pending pool");
        Ok(handle)
    }

    async fn fetch_record(&self, ledger_id: u64) -> Result<GrievanceRecord, LedgerError> {
        let state = self.state.lock().await;
        let record = state
            .records
            .get(ledger_id.wrapping_sub(1) as usize)
            .ok_or(LedgerError::RecordNotFound(ledger_id))?;
        Ok(GrievanceRecord {
            ledger_id: Some(ledger_id),
            submitter_id: record.submitter_id.clone(),
            title: record.title.clone(),
            evidence_ref: record.evidence_ref.clone(),
            status: record.status,
            created_at: record.created_at,
            last_updated_at: record.last_updated_at,
        })
    }

    async fn subscribe(&self, kind: EventKind) -> Result<mpsc::Receiver<LedgerEvent>, LedgerError> {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut state = self.state.lock().await;
        state.subscribers.entry(kind).or_default().push(sender);
        Ok(receiver)
    }

    async fn wait_finalized(&self, handle: &SubmissionHandle) -> Result<(), LedgerError> {
        loop {
            // Register for the next mine() notification before checking,
            // so one landing between check and await cannot be missed
            let notified = self.mined.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.state.lock().await;
                if state.finalized.contains_key(handle) {
                    return Ok(());
                }
                let known = state.pending.iter().any(|w| match w {
                    PendingWrite::Create { handle: h, .. } => h == handle,
                    PendingWrite::StatusUpdate { handle: h, .. } => h == handle,
                });
                if !known {
                    return Err(LedgerError::Rejected(format!(
                        "unknown submission handle {handle}"
                    )));
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_pending_until_mined() {
        let ledger = DevLedger::new();
        let evidence = ContentAddress::new("b3:00");
        ledger
            .submit_create("S001", "Regarding library facilities", &evidence)
            .await
            .unwrap();

        assert!(matches!(
            ledger.fetch_record(1).await,
            Err(LedgerError::RecordNotFound(1))
        ));

        assert_eq!(ledger.mine().await, 1);
        let record = ledger.fetch_record(1).await.unwrap();
        assert_eq!(record.ledger_id, Some(1));
        assert_eq!(record.status, GrievanceStatus::NotProcessed);
        assert_eq!(record.submitter_id, "S001");
    }

    #[tokio::test]
    async fn test_subscription_receives_creation_event() {
        let ledger = DevLedger::new();
        let mut feed = ledger.subscribe(EventKind::RecordCreated).await.unwrap();
        let evidence = ContentAddress::new("b3:00");
        let handle = ledger
            .submit_create("S001", "Hostel mess timings", &evidence)
            .await
            .unwrap();
        ledger.mine().await;

        let event = feed.recv().await.unwrap();
        match event {
            LedgerEvent::RecordCreated {
                handle: event_handle,
                ledger_id,
                ..
            } => {
                assert_eq!(event_handle, handle);
                assert_eq!(ledger_id, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_update_requires_known_record() {
        let ledger = DevLedger::new();
        let err = ledger
            .submit_status_update(9, GrievanceStatus::Acknowledged)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_wait_finalized_unblocks_on_mine() {
        let ledger = DevLedger::new();
        let evidence = ContentAddress::new("b3:00");
        let handle = ledger
            .submit_create("S002", "Wifi outage in block C", &evidence)
            .await
            .unwrap();

        let waiter = {
            let ledger = ledger.clone();
            let handle = handle.clone();
            tokio::spawn(async move { ledger.wait_finalized(&handle).await })
        };
        ledger.mine().await;
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_rebroadcast_duplicates_event() {
        let ledger = DevLedger::new();
        let mut feed = ledger.subscribe(EventKind::RecordCreated).await.unwrap();
        let evidence = ContentAddress::new("b3:00");
        let handle = ledger
            .submit_create("S001", "Lab equipment", &evidence)
            .await
            .unwrap();
        ledger.mine().await;

        assert!(ledger.rebroadcast(&handle).await);
        let first = feed.recv().await.unwrap();
        let second = feed.recv().await.unwrap();
        assert_eq!(first.handle(), second.handle());
    }

    #[tokio::test]
    async fn test_offline_submits_are_unavailable() {
        let ledger = DevLedger::new();
        ledger.set_offline(true).await;
        let evidence = ContentAddress::new("b3:00");
        let err = ledger
            .submit_create("S001", "anything", &evidence)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
    }
}
