use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{api_key_middleware, metrics_middleware};
use super::{events, handlers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Routes requiring the API key, when one is configured
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/pending", get(handlers::list_pending))
        .route("/events", post(events::handle_event))
        .route("/sweep", post(events::run_sweep))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            api_key_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
