//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket matching (search chunks, matched contacts)
//! - Ticket updates (primary comment and voice call steps)
//! - Retry queue (entries queued and cleared, sweeps)
//! - Helpdesk API requests

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Matching
// =============================================================================

/// Search chunks processed by outcome.
pub static SEARCH_CHUNKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lensdesk_search_chunks_total", "Search chunks processed"),
        &["outcome"], // "single", "probed", "empty", "probe_failed"
    )
    .unwrap()
});

/// Contacts matched to a ticket.
pub static CONTACTS_MATCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lensdesk_contacts_matched_total",
        "Total contacts matched to a ticket",
    )
    .unwrap()
});

/// Contacts skipped by category filtering.
pub static CONTACTS_EXCLUDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lensdesk_contacts_excluded_total",
        "Total contacts excluded by category markers",
    )
    .unwrap()
});

// =============================================================================
// Updates
// =============================================================================

/// Primary ticket comment updates by result.
pub static TICKET_UPDATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lensdesk_ticket_updates_total", "Ticket comment updates"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Voice call side updates by step and result.
pub static VOICE_CALL_UPDATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lensdesk_voice_call_updates_total",
            "Voice call transcript updates",
        ),
        &["step", "result"], // step: "patch_call", "create_comment"
    )
    .unwrap()
});

// =============================================================================
// Retry queue
// =============================================================================

/// Pending matches written to the retry store.
pub static RETRIES_QUEUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lensdesk_retries_queued_total",
        "Total pending matches queued for retry",
    )
    .unwrap()
});

/// Pending matches cleared after a successful update.
pub static RETRIES_CLEARED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lensdesk_retries_cleared_total",
        "Total pending matches cleared after update",
    )
    .unwrap()
});

/// Sweeps by result.
pub static SWEEPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lensdesk_sweeps_total", "Scheduled retry sweeps"),
        &["result"], // "empty", "processed", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helpdesk API
// =============================================================================

/// Helpdesk request duration.
pub static HELPDESK_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "lensdesk_helpdesk_request_duration_seconds",
            "Duration of helpdesk API calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"],
    )
    .unwrap()
});

/// Helpdesk requests by operation and status.
pub static HELPDESK_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lensdesk_helpdesk_requests_total",
            "Total helpdesk API requests",
        ),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SEARCH_CHUNKS.clone()),
        Box::new(CONTACTS_MATCHED.clone()),
        Box::new(CONTACTS_EXCLUDED.clone()),
        Box::new(TICKET_UPDATES.clone()),
        Box::new(VOICE_CALL_UPDATES.clone()),
        Box::new(RETRIES_QUEUED.clone()),
        Box::new(RETRIES_CLEARED.clone()),
        Box::new(SWEEPS.clone()),
        Box::new(HELPDESK_REQUEST_DURATION.clone()),
        Box::new(HELPDESK_REQUESTS.clone()),
    ]
}

/// Record the outcome of a helpdesk call.
pub(crate) fn record_helpdesk_request(operation: &str, success: bool, elapsed_secs: f64) {
    let status = if success { "success" } else { "error" };
    HELPDESK_REQUESTS
        .with_label_values(&[operation, status])
        .inc();
    HELPDESK_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(elapsed_secs);
}
