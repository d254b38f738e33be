use anyhow::{anyhow, Result};
use axum::http::header::AUTHORIZATION;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use relay_application::commands::event_commands;
use relay_application::AppState;
use relay_domain::{EventEnvelope, EventPayload};

const RECONNECT_DELAY_SECONDS: u64 = 5;

type UpstreamSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Follows each configured upstream feed and republishes the events it
/// carries. Every feed reconnects on its own after a fixed delay.
pub fn spawn_upstream_bridge(state: AppState) {
    let urls = state.config.upstream_event_urls.clone();
    if urls.is_empty() {
        info!("upstream event bridge disabled: no upstream_event_urls configured");
        return;
    }
    let token = state.config.upstream_event_token.clone();

    for url in urls {
        let loop_state = state.clone();
        let loop_token = token.clone();
        let mut shutdown = state.hub.shutdown_signal();
        tokio::spawn(async move {
            while !*shutdown.borrow() {
                match connect_ws(&url, loop_token.as_deref()).await {
                    Ok(mut ws) => {
                        info!("upstream event bridge connected: url={}", url);
                        if let Err(err) = run_bridge_loop(&loop_state, &mut ws, &mut shutdown).await {
                            warn!("upstream event bridge loop exited: url={}, err={}", url, err);
                        }
                    }
                    Err(err) => {
                        warn!("upstream event bridge connect failed: url={}, err={}", url, err);
                    }
                }
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = sleep(Duration::from_secs(RECONNECT_DELAY_SECONDS)) => {}
                    _ = shutdown.changed() => {}
                }
            }
            info!("upstream event bridge stopped: url={}", url);
        });
    }
}

async fn connect_ws(url: &str, token: Option<&str>) -> Result<UpstreamSocket> {
    let mut request = url.into_client_request()?;
    if let Some(value) = token.filter(|raw| !raw.trim().is_empty()) {
        request
            .headers_mut()
            .insert(AUTHORIZATION, format!("Bearer {}", value).parse()?);
    }
    let (socket, _) = tokio_tungstenite::connect_async(request).await?;
    Ok(socket)
}

async fn run_bridge_loop(
    state: &AppState,
    ws: &mut UpstreamSocket,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *shutdown.borrow() {
            return Ok(());
        }
        let next = tokio::select! {
            next = ws.next() => next,
            _ = shutdown.changed() => continue,
        };
        let Some(next) = next else {
            return Err(anyhow!("ws stream ended"));
        };
        match next {
            Ok(Message::Text(text)) => {
                let events = match parse_upstream_message(text.as_ref()) {
                    Ok(events) => events,
                    Err(err) => {
                        warn!("ignoring upstream message: {}", err);
                        continue;
                    }
                };
                match event_commands::publish_events(state, events).await {
                    Ok(report) => debug!(
                        delivered = report.delivered,
                        dropped = report.dropped,
                        "upstream events relayed"
                    ),
                    Err(err) => warn!("upstream events rejected: {}", err),
                }
            }
            Ok(Message::Ping(bytes)) => {
                ws.send(Message::Pong(bytes)).await?;
            }
            Ok(Message::Close(frame)) => {
                return Err(anyhow!("ws closed by peer: {:?}", frame));
            }
            Ok(_) => {}
            Err(err) => {
                return Err(anyhow!("ws stream error: {}", err));
            }
        }
    }
}

/// Same body shapes as `POST /v1/events`: one event or `{"events": [...]}`.
fn parse_upstream_message(raw_text: &str) -> Result<Vec<EventPayload>> {
    let envelope: EventEnvelope = serde_json::from_str(raw_text)?;
    Ok(envelope.into_events())
}
