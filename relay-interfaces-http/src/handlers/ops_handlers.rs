use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use relay_application::queries::channel_queries::{self, ChannelOverview};
use relay_application::AppState;

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn list_channels(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ChannelOverview>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    Ok(Json(channel_queries::channel_overview(&state).await))
}

pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

/// Ready once at least one model can be rendered.
pub async fn health_ready(State(state): State<AppState>) -> StatusCode {
    if state.models.is_empty() {
        warn!("ready check failed: no models registered");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

pub async fn metrics_prometheus(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string()).into_response();
    }
    let payload = state.metrics.render_prometheus();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    (headers, payload).into_response()
}
