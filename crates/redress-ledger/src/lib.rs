//! # Redress Ledger
//!
//! Collaborator interfaces for the external ledger and evidence store,
//! plus in-process implementations for tests and local development.
//!
//! ## Components
//!
//! - [`LedgerClient`]: typed wrapper over the external ledger (submit,
//!   authoritative read, event subscription, finality wait)
//! - [`LedgerEvent`]/[`EventKind`]: finalization events delivered
//!   at-least-once, ordered per kind
//! - [`DevLedger`]: deterministic in-process ledger with an explicit
//!   pending pool and `mine()` step
//! - [`EvidenceStore`]: content-addressed blob storage consulted before
//!   any ledger interaction

pub mod client;
pub mod devnet;
pub mod events;
pub mod evidence;

pub use client::LedgerClient;
pub use devnet::DevLedger;
pub use events::{EventKind, LedgerEvent};
pub use evidence::{EvidenceError, EvidenceStore, MemoryEvidenceStore};
