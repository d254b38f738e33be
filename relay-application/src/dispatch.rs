use std::sync::Arc;

use tracing::debug;

use relay_domain::{
    ActionKind, ChannelName, DeliveryReport, ModelChange, ModelLabel, ModelMeta, StreamEvent,
};

use crate::{AppError, GroupHub, Metrics};

/// Entry point for producers: turns a change notification into a
/// [`StreamEvent`] and fans it out to the channel's members.
#[derive(Clone)]
pub struct EventDispatcher {
    hub: Arc<GroupHub>,
    metrics: Arc<Metrics>,
}

impl EventDispatcher {
    pub fn new(hub: Arc<GroupHub>, metrics: Arc<Metrics>) -> Self {
        Self { hub, metrics }
    }

    pub async fn dispatch(
        &self,
        channel_name: ChannelName,
        model: ModelLabel,
        pk: impl Into<String>,
        action: ActionKind,
    ) -> DeliveryReport {
        self.publish(StreamEvent::new(channel_name, model, pk, action))
            .await
    }

    pub async fn publish(&self, event: StreamEvent) -> DeliveryReport {
        let channel = event.channel_name.clone();
        let action = event.action.clone();
        let report = self.hub.publish(event).await;
        self.metrics.record_publish(&report);
        debug!(
            channel = %channel,
            action = %action,
            recipients = report.recipients,
            delivered = report.delivered,
            dropped = report.dropped,
            "event dispatched"
        );
        report
    }

    /// Broadcasts a model lifecycle change on the conventional channels:
    /// creations append to the model channel, updates replace on the
    /// instance channel, deletions remove from both.
    pub async fn notify_model_change(
        &self,
        meta: &ModelMeta,
        pk: &str,
        change: ModelChange,
    ) -> Result<DeliveryReport, AppError> {
        let model_channel = ChannelName::for_model(&meta.label);
        let instance_channel = ChannelName::for_instance(&meta.label, pk)?;

        let mut report = DeliveryReport::default();
        match change {
            ModelChange::Created => {
                report.merge(
                    &self
                        .dispatch(model_channel, meta.label.clone(), pk, ActionKind::append())
                        .await,
                );
            }
            ModelChange::Updated => {
                report.merge(
                    &self
                        .dispatch(
                            instance_channel,
                            meta.label.clone(),
                            pk,
                            ActionKind::replace(),
                        )
                        .await,
                );
            }
            ModelChange::Deleted { snapshot } => {
                for channel in [instance_channel, model_channel] {
                    let event =
                        StreamEvent::new(channel, meta.label.clone(), pk, ActionKind::remove())
                            .with_snapshot(snapshot.clone());
                    report.merge(&self.publish(event).await);
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{channel, post_label, Fixture};
    use crate::ConnectionSession;
    use relay_domain::{OutboundFrame, RequestId, RuntimeConfig};
    use serde_json::json;

    #[tokio::test]
    async fn model_changes_use_conventional_channels() {
        let fixture = Fixture::new().await;
        let (mut list, mut list_inbox) = ConnectionSession::open(fixture.state.clone());
        let (mut detail, mut detail_inbox) = ConnectionSession::open(fixture.state.clone());
        list.subscribe(RequestId::new("list"), &fixture.token("blog.post"))
            .await
            .expect("subscribe list");
        detail
            .subscribe(RequestId::new("detail"), &fixture.token("blog.post-1"))
            .await
            .expect("subscribe detail");

        let meta = fixture
            .state
            .models
            .resolve(&post_label())
            .expect("model")
            .meta
            .clone();
        let dispatcher = fixture.state.dispatcher();

        let created = dispatcher
            .notify_model_change(&meta, "1", ModelChange::Created)
            .await
            .expect("created");
        assert_eq!(created.delivered, 1);
        let event = list_inbox.try_recv().expect("list event");
        assert_eq!(event.action.as_str(), "append");
        assert!(detail_inbox.try_recv().is_err());

        let updated = dispatcher
            .notify_model_change(&meta, "1", ModelChange::Updated)
            .await
            .expect("updated");
        assert_eq!(updated.delivered, 1);
        let event = detail_inbox.try_recv().expect("detail event");
        assert_eq!(event.channel_name, channel("blog.post-1"));
        assert_eq!(
            detail.notify(&event).await.expect("frames"),
            vec![OutboundFrame {
                request_id: RequestId::new("detail"),
                data: "replace|post_1|Hello".to_string(),
            }]
        );

        fixture.posts.delete("1").await;
        let deleted = dispatcher
            .notify_model_change(
                &meta,
                "1",
                ModelChange::Deleted {
                    snapshot: json!({"title": "Hello"}),
                },
            )
            .await
            .expect("deleted");
        assert_eq!(deleted.delivered, 2);
        let detail_event = detail_inbox.try_recv().expect("detail removal");
        let list_event = list_inbox.try_recv().expect("list removal");
        assert_eq!(
            detail.notify(&detail_event).await.expect("frames")[0].data,
            "remove|post_1|Hello"
        );
        assert_eq!(
            list.notify(&list_event).await.expect("frames")[0].data,
            "remove|post_1|Hello"
        );
    }

    #[tokio::test]
    async fn dispatch_records_metrics() {
        let fixture = Fixture::new().await;
        let (mut session, _inbox) = ConnectionSession::open(fixture.state.clone());
        session
            .subscribe(RequestId::new("r"), &fixture.token("blog.post"))
            .await
            .expect("subscribe");

        fixture
            .state
            .dispatcher()
            .dispatch(channel("blog.post"), post_label(), "1", ActionKind::append())
            .await;
        let text = fixture.state.metrics.render_prometheus();
        assert!(text.contains("relay_events_published_total 1\n"));
        assert!(text.contains("relay_events_delivered_total 1\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_keep_membership_consistent() {
        let config = RuntimeConfig {
            connection_queue_capacity: 1024,
            ..RuntimeConfig::default()
        };
        let fixture = Fixture::with_config(config).await;
        let token = fixture.token("blog.post");
        let mut handles = Vec::new();

        for idx in 0..32 {
            let state = fixture.state.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                let (mut session, mut inbox) = ConnectionSession::open(state.clone());
                let keep = RequestId::new(format!("keep-{idx}"));
                session.subscribe(keep, &token).await.expect("subscribe");
                for round in 0..20 {
                    let temp = RequestId::new(format!("temp-{idx}-{round}"));
                    session.subscribe(temp.clone(), &token).await.expect("subscribe");
                    state
                        .dispatcher()
                        .dispatch(channel("blog.post"), post_label(), "1", ActionKind::append())
                        .await;
                    session.unsubscribe(&temp).await.expect("unsubscribe");
                }
                let mut per_event = Vec::new();
                while let Ok(event) = inbox.try_recv() {
                    per_event.push(session.notify(&event).await.expect("notify").len());
                }
                (session, inbox, per_event)
            }));
        }

        // Inboxes stay open until the end; a closed inbox is pruned on publish.
        let mut sessions = Vec::new();
        let mut inboxes = Vec::new();
        for handle in handles {
            let (session, inbox, per_event) = handle.await.expect("task");
            inboxes.push(inbox);
            // Own dispatches always arrive; no dispatch arrives twice.
            assert!(per_event.len() >= 20 && per_event.len() <= 32 * 20);
            assert!(per_event.iter().all(|frames| *frames == 1));
            assert!(fixture.state.hub.is_member(&channel("blog.post"), session.id()).await);
            sessions.push(session);
        }
        assert_eq!(fixture.state.hub.member_count(&channel("blog.post")).await, 32);
        drop(inboxes);

        for session in &mut sessions {
            session.disconnect().await;
        }
        assert_eq!(fixture.state.hub.channel_count().await, 0);
    }
}
