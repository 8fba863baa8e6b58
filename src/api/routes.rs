use crate::api::{auth, handlers, AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Enrichment intake, authenticated
        .route(
            "/enrichment",
            post(handlers::submit_enrichment).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_api_key,
            )),
        )
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
}
