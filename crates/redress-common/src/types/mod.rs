//! Core data types for the Redress grievance ledger

pub mod grievance;
pub mod sentiment;
pub mod status;
pub mod submission;
