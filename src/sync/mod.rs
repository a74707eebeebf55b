//! Sync engine: per-run orchestration, conflict resolution, and the cron
//! runner that schedules runs.

pub mod conflict;
pub mod orchestrator;
pub mod runner;

pub use conflict::{ConflictResolver, Resolution, ResolveError};
pub use orchestrator::{SyncOrchestrator, SyncOutcome};
pub use runner::{CronError, CronReport, SyncRunner};

use thiserror::Error;

/// Run-level failures. Item-level failures never surface here; they land in
/// sync log rows and the run keeps going.
#[derive(Debug, Error)]
pub enum SyncRunError {
    /// The connectivity gate failed; the run aborted with zero mutations.
    #[error("connection check failed: {0}")]
    Connection(String),
    #[error("sync run storage error: {0}")]
    Database(#[from] anyhow::Error),
}
