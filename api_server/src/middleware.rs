use crate::{ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// Reject requests whose `Authorization` header is not `Bearer <cron_secret>`.
/// An empty configured secret rejects everything.
pub async fn require_cron_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let secret = state.config.refresh.cron_secret.as_str();
    if secret.is_empty() {
        warn!("Refresh trigger called but no cron secret is configured");
        return Err(ApiError::Unauthorized);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let authorized = provided
        .map(|token| secrets_match(token.as_bytes(), secret.as_bytes()))
        .unwrap_or(false);
    if !authorized {
        debug!("Refresh trigger rejected: missing or wrong bearer token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Compare without short-circuiting on the first differing byte
fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
