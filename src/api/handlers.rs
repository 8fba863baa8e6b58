use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::EnrichmentRequest;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

pub const ACCEPTED_MESSAGE: &str = "Enrichment process started";

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0) as u64;
    let plugins_loaded = state
        .registry
        .loaded()
        .map_or(0, |index| index.plugin_count());

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        plugins_loaded,
        cache_backend: state.service.pipeline().cache_backend().to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub plugins_loaded: usize,
    pub cache_backend: String,
}

/// Accept an enrichment request and process it in the background.
///
/// The body is parsed by hand so that every malformed payload is a 400.
pub async fn submit_enrichment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, &'static str)> {
    let request: EnrichmentRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?;
    request.validate()?;

    tracing::info!(
        data_type = %request.data_type,
        webhook = %request.webhook_uri,
        "Enrichment request accepted"
    );

    // Detached; results reach the caller through the webhook
    drop(state.service.submit(request));

    Ok((StatusCode::ACCEPTED, ACCEPTED_MESSAGE))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    let uptime = (Utc::now() - state.started_at).num_milliseconds().max(0);
    crate::metrics::UPTIME_SECONDS.set(uptime as f64 / 1000.0);
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}
