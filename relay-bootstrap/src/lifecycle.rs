use std::future::Future;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use relay_application::AppState;
use relay_interfaces_http::build_router;

use crate::context::AppContext;
use crate::upstream_bridge::spawn_upstream_bridge;

fn build_router_with_layers(state: AppState) -> Router {
    build_router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(
            usize::try_from(state.config.max_body_bytes).unwrap_or(usize::MAX),
        ))
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(
            state.config.request_timeout_seconds,
        )))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_standalone() -> Result<()> {
    let context = AppContext::new().await?;
    let state = context.state;

    spawn_upstream_bridge(state.clone());

    let addr: std::net::SocketAddr = state.config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    serve(state, listener, shutdown_signal()).await
}

/// Serves until `shutdown` resolves, then closes the hub so every open
/// connection loop exits and graceful shutdown can finish.
pub async fn serve<F>(state: AppState, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = state.hub.clone();
    let app = build_router_with_layers(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown requested, closing connections");
            hub.close_all().await;
        })
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("sigterm handler unavailable: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::sync::oneshot;
    use tokio::time::{sleep, timeout};
    use tokio_tungstenite::tungstenite::Message;

    use relay_application::{ChannelSigner, GroupHub, Metrics, ModelRegistry};
    use relay_domain::{
        ActionKind, ChannelName, FragmentRenderer, ModelLabel, ModelMeta, RuntimeConfig,
        StreamFragment,
    };
    use relay_infrastructure::FixtureEntityTable;

    struct ColonRenderer;

    #[async_trait]
    impl FragmentRenderer for ColonRenderer {
        async fn render(&self, fragment: &StreamFragment) -> anyhow::Result<String> {
            let title = fragment.object["title"].as_str().unwrap_or("");
            Ok(format!("{}:{}:{}", fragment.action, fragment.dom_target, title))
        }
    }

    fn test_state() -> AppState {
        let config = RuntimeConfig {
            signing_secret: "lifecycle-secret".to_string(),
            ..RuntimeConfig::default()
        };
        let table = FixtureEntityTable::from_records(vec![json!({"pk": 1, "title": "Hello"})])
            .expect("table");
        let mut models = ModelRegistry::new();
        models.register(
            ModelMeta::new(ModelLabel::parse("blog.post").expect("label")),
            Arc::new(table),
        );
        let signer =
            ChannelSigner::new(&config.signing_secret, &config.signing_salt).expect("signer");
        AppState {
            config,
            hub: Arc::new(GroupHub::new()),
            signer: Arc::new(signer),
            models: Arc::new(models),
            renderer: Arc::new(ColonRenderer),
            metrics: Arc::new(Metrics::default()),
        }
    }

    #[tokio::test]
    async fn websocket_subscriber_receives_fragments_until_shutdown() {
        let state = test_state();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(state.clone(), listener, async move {
            let _ = stop_rx.await;
        }));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .expect("connect");
        let channel = ChannelName::parse("blog.post").expect("channel");
        let token = state.signer.sign(&channel).expect("sign");
        let subscribe = json!({
            "type": "subscribe",
            "request_id": "r1",
            "signed_channel_name": token,
        });
        ws.send(Message::Text(subscribe.to_string().into()))
            .await
            .expect("send subscribe");

        timeout(Duration::from_secs(5), async {
            while state.hub.member_count(&channel).await == 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("joined in time");

        state
            .dispatcher()
            .dispatch(
                channel,
                ModelLabel::parse("blog.post").expect("label"),
                "1",
                ActionKind::append(),
            )
            .await;

        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("message");
        let frame: Value = serde_json::from_str(message.to_text().expect("text")).expect("json");
        assert_eq!(frame, json!({"request_id": "r1", "data": "append:posts:Hello"}));

        stop_tx.send(()).expect("stop");
        timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops")
            .expect("join")
            .expect("serve");
        assert_eq!(state.hub.channel_count().await, 0);

        let after = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("socket closed in time");
        assert!(!matches!(after, Some(Ok(Message::Text(_)))));
    }

    #[tokio::test]
    async fn readiness_requires_registered_models() {
        let state = test_state();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(state, listener, async move {
            let _ = stop_rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
        let request = format!(
            "GET /v1/ops/health/ready HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            addr
        );
        tokio::io::AsyncWriteExt::write_all(&mut stream, request.as_bytes())
            .await
            .expect("write");
        let mut response = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
            .await
            .expect("read");
        assert!(response.starts_with("HTTP/1.1 200"), "{}", response);

        stop_tx.send(()).expect("stop");
        server.await.expect("join").expect("serve");
    }
}
