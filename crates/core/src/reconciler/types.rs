//! Types for the reconciler.

use serde::Serialize;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::helpdesk::HelpdeskError;
use crate::updater::UpdateReport;

use super::EventError;

/// Failures that end an invocation. Everything transient is absorbed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("helpdesk unavailable: {0}")]
    Helpdesk(#[from] HelpdeskError),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("invalid event: {0}")]
    Event(#[from] EventError),

    #[error("analysis document {0} has no contact id")]
    MissingContactId(String),
}

/// Result of handling one new analysis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Filtered out by category markers.
    Excluded { contact_id: String },
    /// A ticket was found and the update attempted.
    Updated {
        contact_id: String,
        success: bool,
        report: UpdateReport,
    },
    /// No ticket yet. `stored` is false when the retry write failed.
    Deferred { contact_id: String, stored: bool },
}

/// Result of one retry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Live entries found in the store.
    pub pending: usize,
    pub matched: usize,
    /// Tickets whose note was accepted.
    pub updated: usize,
    /// Entries removed from the store after a successful update.
    pub cleared: usize,
    /// Matched entries left pending for the next sweep.
    pub failed: usize,
}

/// Result of dispatching a trigger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum EventOutcome {
    ObjectCreated { result: AnalysisOutcome },
    Scheduled { result: SweepReport },
}
