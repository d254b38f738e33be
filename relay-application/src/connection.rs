use std::collections::HashSet;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use relay_domain::{
    resolve_dom_target, ChannelName, ClientMessage, ConnectionId, ErrorCode, ErrorFrame,
    MissingEntityPolicy, OutboundFrame, RequestId, ServerFrame, StreamEvent, StreamFragment,
};

use crate::ops::group_hub::{EventInbox, InboxSender};
use crate::subscriptions::SubscriptionRegistry;
use crate::{AppError, AppState, Metrics};

/// State of one client connection: its subscriptions and the groups it has
/// joined on their behalf.
///
/// A channel is joined exactly while the registry holds at least one request
/// id for it. The session is driven by a single task, see
/// [`crate::worker::run_session`].
pub struct ConnectionSession {
    id: ConnectionId,
    state: AppState,
    inbox: InboxSender,
    registry: SubscriptionRegistry,
    joined: HashSet<ChannelName>,
    closed: bool,
}

impl ConnectionSession {
    pub fn open(state: AppState) -> (Self, EventInbox) {
        let capacity = state.config.connection_queue_capacity.max(1);
        let (inbox, receiver) = mpsc::channel(capacity);
        let session = Self {
            id: ConnectionId::new(),
            state,
            inbox,
            registry: SubscriptionRegistry::new(),
            joined: HashSet::new(),
            closed: false,
        };
        session.state.metrics.record_connection_opened();
        info!(connection_id = %session.id, "connection opened");
        (session, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.state.hub.shutdown_signal()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.state.metrics
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn is_joined(&self, channel: &ChannelName) -> bool {
        self.joined.contains(channel)
    }

    /// Parses and handles one inbound text frame. Unparseable frames are
    /// ignored unless error frames are enabled.
    pub async fn handle_text(&mut self, raw: &str) -> Vec<ServerFrame> {
        match serde_json::from_str::<ClientMessage>(raw) {
            Ok(message) => self.handle_message(message).await,
            Err(err) => {
                debug!(connection_id = %self.id, error = %err, "ignoring malformed client message");
                self.error_frame(None, ErrorCode::BadMessage)
            }
        }
    }

    pub async fn handle_message(&mut self, message: ClientMessage) -> Vec<ServerFrame> {
        match message {
            ClientMessage::Subscribe {
                request_id,
                signed_channel_name,
            } => match self.subscribe(request_id.clone(), &signed_channel_name).await {
                Ok(_) => Vec::new(),
                Err(_) => self.error_frame(Some(request_id), ErrorCode::InvalidSignature),
            },
            ClientMessage::Unsubscribe { request_id } => {
                // Unknown request ids are a no-op.
                let _ = self.unsubscribe(&request_id).await;
                Vec::new()
            }
        }
    }

    pub async fn subscribe(
        &mut self,
        request_id: RequestId,
        signed_channel_name: &str,
    ) -> Result<ChannelName, AppError> {
        let channel = match self.state.signer.verify(signed_channel_name) {
            Ok(channel) => channel,
            Err(err) => {
                self.state.metrics.record_invalid_signature();
                warn!(
                    connection_id = %self.id,
                    request_id = %request_id,
                    "signature has been tampered with, dropping subscribe"
                );
                return Err(err);
            }
        };

        if self.registry.add(channel.clone(), request_id.clone()) {
            self.state
                .hub
                .join(&channel, self.id, self.inbox.clone())
                .await;
            self.joined.insert(channel.clone());
        }
        self.state.metrics.record_subscription();
        debug!(
            connection_id = %self.id,
            request_id = %request_id,
            channel = %channel,
            "subscribed"
        );
        Ok(channel)
    }

    pub async fn unsubscribe(&mut self, request_id: &RequestId) -> Result<ChannelName, AppError> {
        let Some(removed) = self.registry.remove_by_request_id(request_id) else {
            debug!(connection_id = %self.id, request_id = %request_id, "no subscription to remove");
            return Err(AppError::SubscriptionNotFound(request_id.clone()));
        };

        if removed.drained {
            self.state.hub.leave(&removed.channel, self.id).await;
            self.joined.remove(&removed.channel);
        }
        debug!(
            connection_id = %self.id,
            request_id = %request_id,
            channel = %removed.channel,
            left_group = removed.drained,
            "unsubscribed"
        );
        Ok(removed.channel)
    }

    /// Renders one frame per request id registered under the event's channel,
    /// in registry order. A missing entity is an error unless the configured
    /// policy says to skip it.
    pub async fn notify(&self, event: &StreamEvent) -> Result<Vec<OutboundFrame>, AppError> {
        match self.render_frames(event).await {
            Err(AppError::EntityNotFound { model, pk })
                if self.state.config.missing_entity_policy == MissingEntityPolicy::Skip =>
            {
                warn!(
                    connection_id = %self.id,
                    model = %model,
                    pk = %pk,
                    "entity no longer exists, skipping event"
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn render_frames(&self, event: &StreamEvent) -> Result<Vec<OutboundFrame>, AppError> {
        let request_ids = self.registry.lookup(&event.channel_name);
        if request_ids.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.state.models.resolve(&event.model)?;
        let dom_target = resolve_dom_target(&model.meta, &event.pk, &event.action);
        let limit = Duration::from_secs(self.state.config.request_timeout_seconds.max(1));

        let object = match &event.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => timeout(limit, model.store.fetch(&event.pk))
                .await
                .map_err(|_| {
                    AppError::Internal(anyhow!("fetching {} '{}' timed out", event.model, event.pk))
                })??
                .ok_or_else(|| AppError::EntityNotFound {
                    model: event.model.clone(),
                    pk: event.pk.clone(),
                })?,
        };

        let fragment = StreamFragment {
            model_template: model.meta.template_path(),
            model: model.meta.clone(),
            action: event.action.clone(),
            dom_target,
            object,
        };
        let data = timeout(limit, self.state.renderer.render(&fragment))
            .await
            .map_err(|_| AppError::Internal(anyhow!("rendering {} timed out", event.model)))??;

        Ok(request_ids
            .iter()
            .map(|request_id| OutboundFrame {
                request_id: request_id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    /// Leaves every joined group and discards the registry. Safe to call
    /// more than once.
    pub async fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.state.hub.leave_all(self.id, self.joined.iter()).await;
        self.joined.clear();
        self.registry.drain();
        self.state.metrics.record_connection_closed();
        info!(connection_id = %self.id, "connection closed");
    }

    fn error_frame(&self, request_id: Option<RequestId>, error: ErrorCode) -> Vec<ServerFrame> {
        if !self.state.config.emit_error_frames {
            return Vec::new();
        }
        vec![ServerFrame::Error(ErrorFrame { request_id, error })]
    }
}
