// Stream event entity
// A change notification for one entity, fanned out to a channel's members

use serde::{Deserialize, Serialize};

use crate::value_objects::{ActionKind, ChannelName, ModelLabel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub channel_name: ChannelName,
    pub model: ModelLabel,
    pub pk: String,
    pub action: ActionKind,
    /// Entity state captured by the producer. Connections render it instead of
    /// fetching from the store, which is what deletions rely on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
}

impl StreamEvent {
    pub fn new(
        channel_name: ChannelName,
        model: ModelLabel,
        pk: impl Into<String>,
        action: ActionKind,
    ) -> Self {
        Self {
            channel_name,
            model,
            pk: pk.into(),
            action,
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

/// Lifecycle change reported by a model-change signal handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChange {
    Created,
    Updated,
    Deleted { snapshot: serde_json::Value },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Connections joined to the channel when the event was published.
    pub recipients: usize,
    pub delivered: usize,
    /// Dropped because the connection's inbox was full.
    pub dropped: usize,
    /// Connections whose inbox was already closed; pruned from the group.
    pub closed: usize,
}

impl DeliveryReport {
    pub fn merge(&mut self, other: &DeliveryReport) {
        self.recipients += other.recipients;
        self.delivered += other.delivered;
        self.dropped += other.dropped;
        self.closed += other.closed;
    }
}

/// Event as submitted by an out-of-process producer, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPayload {
    pub channel_name: String,
    pub model: String,
    /// String or integer primary key.
    pub pk: serde_json::Value,
    pub action: String,
    #[serde(default)]
    pub snapshot: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventEnvelope {
    Batch { events: Vec<EventPayload> },
    Single(EventPayload),
}

impl EventEnvelope {
    pub fn into_events(self) -> Vec<EventPayload> {
        match self {
            EventEnvelope::Batch { events } => events,
            EventEnvelope::Single(event) => vec![event],
        }
    }
}
