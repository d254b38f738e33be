use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;

use relay_application::commands::{channel_commands, event_commands};
use relay_application::AppState;
use relay_domain::{ChannelSignRequest, ChannelSignResponse, DeliveryReport};

use crate::error::HttpError;
use crate::middleware::{authorize, parse_events};

pub async fn publish_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<DeliveryReport>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }

    let events = parse_events(&headers, &body).map_err(|err| {
        error!("failed to parse event body: {}", err);
        HttpError::BadRequest(err.to_string())
    })?;
    let report = event_commands::publish_events(&state, events).await?;
    Ok(Json(report))
}

pub async fn sign_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChannelSignRequest>,
) -> Result<Json<ChannelSignResponse>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let response = channel_commands::sign_channel(&state, payload).await?;
    Ok(Json(response))
}
