use std::collections::HashMap;

use relay_domain::{ChannelName, RequestId};

/// Result of removing one request id from a connection's registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedSubscription {
    pub channel: ChannelName,
    /// No request id references `channel` any more.
    pub drained: bool,
}

/// Per-connection map from channel to the request ids interested in it.
///
/// Owned by a single connection task, so it carries no locking. Request ids
/// keep insertion order and may repeat; channels are scanned in the order
/// they were first subscribed.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    requests: HashMap<ChannelName, Vec<RequestId>>,
    order: Vec<ChannelName>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `request_id` under `channel`. Returns true when this is the
    /// first live interest in `channel`.
    pub fn add(&mut self, channel: ChannelName, request_id: RequestId) -> bool {
        match self.requests.get_mut(&channel) {
            Some(ids) => {
                let first = ids.is_empty();
                ids.push(request_id);
                first
            }
            None => {
                self.order.push(channel.clone());
                self.requests.insert(channel, vec![request_id]);
                true
            }
        }
    }

    /// Removes the first occurrence of `request_id`, searching channels in
    /// subscription order. `None` when no channel holds it.
    pub fn remove_by_request_id(&mut self, request_id: &RequestId) -> Option<RemovedSubscription> {
        let (channel, drained) = self.order.iter().find_map(|channel| {
            let ids = self.requests.get_mut(channel)?;
            let position = ids.iter().position(|candidate| candidate == request_id)?;
            ids.remove(position);
            Some((channel.clone(), ids.is_empty()))
        })?;

        if drained {
            self.requests.remove(&channel);
            self.order.retain(|candidate| candidate != &channel);
        }
        Some(RemovedSubscription { channel, drained })
    }

    pub fn lookup(&self, channel: &ChannelName) -> &[RequestId] {
        self.requests
            .get(channel)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn interest_count(&self, channel: &ChannelName) -> usize {
        self.lookup(channel).len()
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelName> {
        self.order.iter()
    }

    /// Total number of live request ids across channels.
    pub fn len(&self) -> usize {
        self.requests.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Empties the registry and returns the channels that had interest.
    pub fn drain(&mut self) -> Vec<ChannelName> {
        self.requests.clear();
        std::mem::take(&mut self.order)
    }
}
