//! Reconciliation of analysis documents with helpdesk tickets.
//!
//! Two triggers drive it: a new analysis document (match the single contact,
//! update or defer) and a scheduled sweep over the retry store.

mod event;
mod runner;
mod types;

pub use event::{EventError, TriggerEvent};
pub use runner::Reconciler;
pub use types::{AnalysisOutcome, EventOutcome, ReconcileError, SweepReport};
