//! Election orchestrator.
//!
//! The top-level state machine:
//! `Authenticating -> Polling -> (Claiming) -> Polling -> ...`, ending in
//! `Exhausted` once the watch-list is empty or `Fatal` when the credentials
//! are rejected.

mod config;
mod runner;
mod types;

pub use config::ElectionConfig;
pub use runner::ElectionOrchestrator;
pub use types::{CycleOutcome, ElectionError, ElectionReport, ElectionState, Target};
