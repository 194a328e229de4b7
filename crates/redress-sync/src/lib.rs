//! # Redress Sync
//!
//! The ledger synchronization engine. Keeps the relational projection
//! correctly and idempotently in step with the ledger's at-least-once
//! event feed while supporting an optimistic write path whose final
//! ledger identifier is unknown at submit time.
//!
//! ## Components
//!
//! - [`store::SyncStore`]: correlation records + projection rows behind
//!   one trait, because the two must commit together
//! - [`store::MemorySyncStore`] / [`store::PgSyncStore`]: in-memory and
//!   Postgres backends
//! - [`lifecycle`]: the pure six-state transition machine
//! - [`projector::EventProjector`]: one long-running task per event kind,
//!   applying each finalization exactly once
//! - [`service::GrievanceService`]: the write path and query surface
//!   exposed to the API layer
//!
//! ## Synchronization flow
//!
//! ```text
//!  write path ──> lifecycle (validate) ──> LedgerClient (submit)
//!        │                                        │ handle
//!        └──> SyncStore: optimistic row + pending submission (one tx)
//!
//!  ledger event feed ──> EventProjector ──> SyncStore.confirm_* (one tx:
//!        row update + audit entry + mark confirmed, idempotent)
//! ```

pub mod lifecycle;
pub mod metrics;
pub mod projector;
pub mod service;
pub mod store;

pub use lifecycle::validate_transition;
pub use metrics::ProjectorMetrics;
pub use projector::{EventProjector, ProjectorHandle};
pub use service::{GrievanceService, SubmitGrievance};
pub use store::{
    Confirmation, GrievanceFilter, MemorySyncStore, NewGrievance, PendingStatusUpdate,
    PgSyncStore, ResolutionStats, StoreError, SyncStore,
};
