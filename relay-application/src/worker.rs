use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};

use relay_domain::ServerFrame;

use crate::ops::group_hub::EventInbox;
use crate::{AppError, ConnectionSession};

/// Why a connection loop ended.
#[derive(Debug)]
pub enum SessionExit {
    /// The client closed or the transport stream ended.
    ClientClosed,
    /// The writer half is gone, usually after a send failure.
    OutboundClosed,
    /// The server is shutting down.
    ServerShutdown,
    /// A notified entity no longer exists and the policy is to fail.
    DeliveryFailed(AppError),
}

/// Drives one connection until the client leaves, the writer dies or a
/// delivery fails. Inbound frames and hub events are handled by this task
/// alone, and every outbound frame goes through `outbound`, whose single
/// consumer owns the socket. The session is always disconnected on return.
pub async fn run_session<S>(
    mut session: ConnectionSession,
    mut inbox: EventInbox,
    mut inbound: S,
    outbound: mpsc::Sender<ServerFrame>,
) -> SessionExit
where
    S: Stream<Item = String> + Unpin,
{
    let mut shutdown = session.shutdown_signal();
    let exit = loop {
        if *shutdown.borrow() {
            break SessionExit::ServerShutdown;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break SessionExit::ServerShutdown;
                }
            }
            frame = inbound.next() => {
                let Some(text) = frame else {
                    break SessionExit::ClientClosed;
                };
                let replies = session.handle_text(&text).await;
                if !push_frames(&session, &outbound, replies) {
                    break SessionExit::OutboundClosed;
                }
            }
            event = inbox.recv() => {
                let Some(event) = event else {
                    break SessionExit::ServerShutdown;
                };
                match session.notify(&event).await {
                    Ok(frames) => {
                        let frames = frames.into_iter().map(ServerFrame::from).collect();
                        if !push_frames(&session, &outbound, frames) {
                            break SessionExit::OutboundClosed;
                        }
                    }
                    Err(err @ AppError::EntityNotFound { .. }) => {
                        session.metrics().record_delivery_failure();
                        error!(
                            connection_id = %session.id(),
                            channel = %event.channel_name,
                            error = %err,
                            "delivery failed, closing connection"
                        );
                        break SessionExit::DeliveryFailed(err);
                    }
                    Err(err) => {
                        session.metrics().record_delivery_failure();
                        error!(
                            connection_id = %session.id(),
                            channel = %event.channel_name,
                            error = %err,
                            "delivery failed, event skipped"
                        );
                    }
                }
            }
        }
    };

    session.disconnect().await;
    info!(connection_id = %session.id(), exit = ?exit, "connection loop finished");
    exit
}

/// Queues frames without waiting. A full queue drops the frame; returns
/// false once the writer is gone.
fn push_frames(
    session: &ConnectionSession,
    outbound: &mpsc::Sender<ServerFrame>,
    frames: Vec<ServerFrame>,
) -> bool {
    let mut sent = 0;
    for frame in frames {
        match outbound.try_send(frame) {
            Ok(()) => sent += 1,
            Err(TrySendError::Full(_)) => {
                session.metrics().record_frame_dropped();
                warn!(connection_id = %session.id(), "outbound queue full, dropping frame");
            }
            Err(TrySendError::Closed(_)) => return false,
        }
    }
    session.metrics().record_frames_sent(sent);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{channel, post_label, Fixture};
    use relay_domain::{ActionKind, OutboundFrame, RequestId};

    fn subscribe_frame(request_id: &str, token: &str) -> String {
        serde_json::json!({
            "type": "subscribe",
            "request_id": request_id,
            "signed_channel_name": token,
        })
        .to_string()
    }

    #[tokio::test]
    async fn loop_delivers_frames_and_cleans_up_on_close() {
        let fixture = Fixture::new().await;
        let (session, inbox) = ConnectionSession::open(fixture.state.clone());
        let connection = session.id();
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(8);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(8);
        let inbound = futures_util::stream::unfold(inbound_rx, |mut rx| async move {
            rx.recv().await.map(|text| (text, rx))
        });

        let task = tokio::spawn(run_session(
            session,
            inbox,
            Box::pin(inbound),
            outbound_tx,
        ));

        inbound_tx
            .send(subscribe_frame("r1", &fixture.token("blog.post")))
            .await
            .expect("send subscribe");
        while !fixture.state.hub.is_member(&channel("blog.post"), connection).await {
            tokio::task::yield_now().await;
        }

        fixture
            .state
            .dispatcher()
            .dispatch(channel("blog.post"), post_label(), "1", ActionKind::append())
            .await;
        let frame = outbound_rx.recv().await.expect("frame");
        assert_eq!(
            frame,
            ServerFrame::Payload(OutboundFrame {
                request_id: RequestId::new("r1"),
                data: "append|posts|Hello".to_string(),
            })
        );

        drop(inbound_tx);
        let exit = task.await.expect("join");
        assert!(matches!(exit, SessionExit::ClientClosed));
        assert_eq!(fixture.state.hub.channel_count().await, 0);
        assert_eq!(fixture.state.metrics.active_connections(), 0);
    }

    #[tokio::test]
    async fn missing_entity_closes_the_connection() {
        let fixture = Fixture::new().await;
        let (session, inbox) = ConnectionSession::open(fixture.state.clone());
        let (outbound_tx, _outbound_rx) = mpsc::channel(8);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(8);
        let inbound = futures_util::stream::unfold(inbound_rx, |mut rx| async move {
            rx.recv().await.map(|text| (text, rx))
        });
        let connection = session.id();
        let task = tokio::spawn(run_session(
            session,
            inbox,
            Box::pin(inbound),
            outbound_tx,
        ));

        inbound_tx
            .send(subscribe_frame("r1", &fixture.token("blog.post")))
            .await
            .expect("send subscribe");
        while !fixture.state.hub.is_member(&channel("blog.post"), connection).await {
            tokio::task::yield_now().await;
        }

        fixture
            .state
            .dispatcher()
            .dispatch(channel("blog.post"), post_label(), "404", ActionKind::replace())
            .await;
        let exit = task.await.expect("join");
        assert!(matches!(
            exit,
            SessionExit::DeliveryFailed(AppError::EntityNotFound { .. })
        ));
        assert!(!fixture.state.hub.is_member(&channel("blog.post"), connection).await);
    }

    #[tokio::test]
    async fn closed_writer_ends_the_loop() {
        let fixture = Fixture::new().await;
        let (mut session, inbox) = ConnectionSession::open(fixture.state.clone());
        session
            .subscribe(RequestId::new("r1"), &fixture.token("blog.post"))
            .await
            .expect("subscribe");
        let (outbound_tx, outbound_rx) = mpsc::channel(8);
        drop(outbound_rx);

        fixture
            .state
            .dispatcher()
            .dispatch(channel("blog.post"), post_label(), "1", ActionKind::append())
            .await;
        let exit = run_session(session, inbox, futures_util::stream::pending(), outbound_tx).await;
        assert!(matches!(exit, SessionExit::OutboundClosed));
        assert_eq!(fixture.state.hub.channel_count().await, 0);
    }

    #[tokio::test]
    async fn full_outbound_queue_drops_frames() {
        let fixture = Fixture::new().await;
        let (mut session, inbox) = ConnectionSession::open(fixture.state.clone());
        let token = fixture.token("blog.post");
        for request_id in ["r1", "r2"] {
            session
                .subscribe(RequestId::new(request_id), &token)
                .await
                .expect("subscribe");
        }
        let (outbound_tx, mut outbound_rx) = mpsc::channel(1);

        fixture
            .state
            .dispatcher()
            .dispatch(channel("blog.post"), post_label(), "1", ActionKind::append())
            .await;
        let task = tokio::spawn(run_session(
            session,
            inbox,
            futures_util::stream::pending(),
            outbound_tx,
        ));

        let first = outbound_rx.recv().await.expect("frame");
        assert!(matches!(
            first,
            ServerFrame::Payload(OutboundFrame { ref request_id, .. }) if request_id == &RequestId::new("r1")
        ));

        fixture.state.hub.close_all().await;
        let exit = task.await.expect("join");
        assert!(matches!(exit, SessionExit::ServerShutdown));
        assert!(outbound_rx.try_recv().is_err());

        let text = fixture.state.metrics.render_prometheus();
        assert!(text.contains("relay_frames_sent_total 1\n"));
        assert!(text.contains("relay_frames_dropped_total 1\n"));
    }

    #[tokio::test]
    async fn hub_shutdown_ends_idle_loops() {
        let fixture = Fixture::new().await;
        let (mut session, inbox) = ConnectionSession::open(fixture.state.clone());
        session
            .subscribe(RequestId::new("r1"), &fixture.token("blog.post"))
            .await
            .expect("subscribe");
        let (outbound_tx, _outbound_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_session(
            session,
            inbox,
            futures_util::stream::pending(),
            outbound_tx,
        ));

        fixture.state.hub.close_all().await;
        let exit = task.await.expect("join");
        assert!(matches!(exit, SessionExit::ServerShutdown));
        assert_eq!(fixture.state.metrics.active_connections(), 0);
    }
}
