use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{future, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use relay_application::worker::run_session;
use relay_application::{AppState, ConnectionSession};
use relay_domain::ServerFrame;

/// GET /ws
///
/// No credentials are checked at upgrade time; each subscribe carries its
/// own signed channel name.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let outbound_capacity = state.config.outbound_queue_capacity.max(1);
    let (session, inbox) = ConnectionSession::open(state);
    let connection_id = session.id();

    let (sink, stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerFrame>(outbound_capacity);
    let writer = tokio::spawn(writer_task(sink, outbound_rx));

    // Text frames feed the session; the stream ends on close or a transport error.
    let inbound = stream
        .take_while(move |message| {
            let open = match message {
                Ok(Message::Close(frame)) => {
                    debug!(connection_id = %connection_id, reason = ?frame, "client initiated close");
                    false
                }
                Ok(_) => true,
                Err(err) => {
                    warn!(connection_id = %connection_id, error = %err, "websocket receive error");
                    false
                }
            };
            future::ready(open)
        })
        .filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(text),
                _ => None,
            })
        });

    run_session(session, inbox, Box::pin(inbound), outbound_tx).await;
    writer.abort();
}

/// Sole owner of the socket sink; serializes every send to this client.
async fn writer_task(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<ServerFrame>) {
    while let Some(frame) = rx.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to encode outbound frame: {}", err);
                continue;
            }
        };
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}
