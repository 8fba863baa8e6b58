use crate::api::AppState;
use crate::error::{AppError, Result};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Reject requests whose `Authorization` header is not a configured API key
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let key = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("missing API key".to_string()))?;

    let owner = state
        .api_keys
        .get(key)
        .ok_or_else(|| AppError::Authentication("invalid API key".to_string()))?;

    tracing::debug!(api_key_owner = %owner, "Authenticated request");
    Ok(next.run(request).await)
}
