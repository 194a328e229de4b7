//! EventProjector - the asynchronous heart of the engine
//!
//! Owns one persistent subscription per event kind and applies each
//! delivered event to the relational projection through the store's
//! idempotent confirmation ops. A failure while projecting one event is
//! isolated to that event: the submission stays pending, the store
//! transaction rolls back, and the listener keeps going. Unknown handles
//! (foreign writes, orphaned optimistic writes, status events racing
//! ahead of their creation) are logged and skipped, never fatal.

use std::sync::Arc;

use redress_common::{LedgerError, RedressError};
use redress_ledger::{EventKind, LedgerClient, LedgerEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::metrics::ProjectorMetrics;
use crate::store::{Confirmation, SyncStore};

/// Long-running projector with an explicit lifecycle
pub struct EventProjector {
    store: Arc<dyn SyncStore>,
    ledger: Arc<dyn LedgerClient>,
    metrics: Arc<ProjectorMetrics>,
}

/// Handle to the running subscription tasks
pub struct ProjectorHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ProjectorHandle {
    /// Signal both subscription tasks to stop and wait for them
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

impl EventProjector {
    pub fn new(store: Arc<dyn SyncStore>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            store,
            ledger,
            metrics: Arc::new(ProjectorMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<ProjectorMetrics> {
        self.metrics.clone()
    }

    /// Open one subscription per event kind and spawn its task. Runs for
    /// process lifetime unless shut down through the returned handle.
    pub async fn start(&self) -> Result<ProjectorHandle, RedressError> {
        let (shutdown, _) = watch::channel(false);
        let mut tasks = Vec::with_capacity(EventKind::ALL.len());

        for kind in EventKind::ALL {
            let mut feed = self
                .ledger
                .subscribe(kind)
                .await
                .map_err(RedressError::Ledger)?;
            let store = self.store.clone();
            let metrics = self.metrics.clone();
            let mut stop = shutdown.subscribe();

            tasks.push(tokio::spawn(async move {
                info!(%kind, "projector subscription open");
                loop {
                    tokio::select! {
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                break;
                            }
                        }
                        delivery = feed.recv() => {
                            match delivery {
                                Some(event) => {
                                    Self::project(store.as_ref(), &metrics, event).await;
                                }
                                None => {
                                    warn!(%kind, error = %LedgerError::SubscriptionClosed, "event feed ended");
                                    break;
                                }
                            }
                        }
                    }
                }
                info!(%kind, "projector subscription closed");
            }));
        }

        Ok(ProjectorHandle { shutdown, tasks })
    }

    async fn project(store: &dyn SyncStore, metrics: &ProjectorMetrics, event: LedgerEvent) {
        let kind = event.kind();
        let handle = event.handle().clone();

        let outcome = match &event {
            LedgerEvent::RecordCreated {
                handle,
                ledger_id,
                created_at,
                ..
            } => store.confirm_creation(handle, *ledger_id, *created_at).await,
            LedgerEvent::StatusChanged {
                handle,
                ledger_id,
                status,
                updated_at,
            } => {
                store
                    .confirm_status(handle, *ledger_id, *status, *updated_at)
                    .await
            }
        };

        match outcome {
            Ok(Confirmation::Applied(row)) => {
                metrics.events_applied.inc();
                info!(
                    %kind,
                    %handle,
                    row_id = row.id,
                    ledger_id = row.ledger_id,
                    status = %row.status,
                    "event projected"
                );
            }
            Ok(Confirmation::AlreadyConfirmed) => {
                metrics.duplicates_discarded.inc();
                debug!(%kind, %handle, "duplicate delivery discarded");
            }
            Ok(Confirmation::UnknownHandle) => {
                metrics.events_skipped.inc();
                warn!(
                    %kind,
                    %handle,
                    "no matching local submission, skipping event"
                );
            }
            Err(err) => {
                metrics.projection_failures.inc();
                error!(
                    %kind,
                    %handle,
                    error = %err,
                    "projection failed, submission left pending for redelivery"
                );
            }
        }
    }
}
