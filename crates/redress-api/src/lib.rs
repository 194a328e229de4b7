//! # Redress API
//!
//! REST surface over the synchronization engine. Authentication and
//! session handling live in front of this service; submitter and actor
//! identifiers arrive as request fields.

pub mod config;
pub mod routes;

pub use config::ApiConfig;
pub use routes::{router, AppState};
