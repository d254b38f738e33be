use axum::routing::{get, post};
use axum::Router;

use relay_application::AppState;

use crate::handlers::{event_handlers, ops_handlers, ws_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handlers::ws_upgrade))
        .route("/v1/events", post(event_handlers::publish_events))
        .route("/v1/channels/sign", post(event_handlers::sign_channel))
        .route("/v1/ops/channels", get(ops_handlers::list_channels))
        .route("/v1/ops/health/live", get(ops_handlers::health_live))
        .route("/v1/ops/health/ready", get(ops_handlers::health_ready))
        .route(
            "/v1/ops/metrics/prometheus",
            get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
