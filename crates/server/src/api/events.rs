//! Trigger endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

use lensdesk_core::{EventOutcome, ReconcileError, SweepReport, TriggerEvent};

use super::handlers::ErrorResponse;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: &ReconcileError) -> ApiError {
    let status = match e {
        ReconcileError::Event(_) | ReconcileError::MissingContactId(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ReconcileError::Analysis(lensdesk_core::AnalysisError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        ReconcileError::Analysis(lensdesk_core::AnalysisError::InvalidKey(_)) => {
            StatusCode::BAD_REQUEST
        }
        ReconcileError::Helpdesk(e) if e.is_configuration() => StatusCode::SERVICE_UNAVAILABLE,
        ReconcileError::Helpdesk(_) => StatusCode::BAD_GATEWAY,
        ReconcileError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// POST /api/v1/events
///
/// Accepts a storage notification or a scheduler event and dispatches it.
pub async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<EventOutcome>, ApiError> {
    let event = TriggerEvent::from_value(&body).map_err(|e| {
        warn!(error = %e, "Rejected trigger event");
        error_response(&ReconcileError::Event(e))
    })?;

    state.dispatch(&event).await.map(Json).map_err(|e| {
        error!(error = %e, event = ?event, "Trigger event failed");
        error_response(&e)
    })
}

/// POST /api/v1/sweep
///
/// Runs a retry sweep immediately.
pub async fn run_sweep(State(state): State<Arc<AppState>>) -> Result<Json<SweepReport>, ApiError> {
    state.sweep().await.map(Json).map_err(|e| {
        error!(error = %e, "Sweep failed");
        error_response(&e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensdesk_core::{AnalysisError, EventError, HelpdeskError};

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                ReconcileError::Event(EventError::MissingObjectKey),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ReconcileError::Analysis(AnalysisError::NotFound("k".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ReconcileError::Analysis(AnalysisError::InvalidKey("../k".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ReconcileError::Analysis(AnalysisError::Parse("bad".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ReconcileError::Helpdesk(HelpdeskError::MissingCredentials("helpdesk.url".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ReconcileError::Helpdesk(HelpdeskError::Timeout),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err).0, expected, "{}", err);
        }
    }
}
