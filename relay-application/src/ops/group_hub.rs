use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, warn};

use relay_domain::{ChannelName, ConnectionId, DeliveryReport, StreamEvent};

/// Receiving half of a connection's bounded event queue.
///
/// Dropping it while still joined lets the next `publish` prune the member
/// without telling the owning `ConnectionSession`, whose joined set then goes
/// stale. Keep the inbox alive until `ConnectionSession::disconnect` has run,
/// as `run_session` does.
pub type EventInbox = mpsc::Receiver<Arc<StreamEvent>>;
pub type InboxSender = mpsc::Sender<Arc<StreamEvent>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStat {
    pub channel_name: ChannelName,
    pub members: usize,
}

/// Process-wide channel membership: which connections receive events
/// published on which channel.
///
/// Each member is stored once per channel together with the sending half of
/// its bounded inbox. Publishing never waits on a member: a full inbox drops
/// the event for that member only, and a closed inbox is pruned.
pub struct GroupHub {
    groups: RwLock<HashMap<ChannelName, HashMap<ConnectionId, InboxSender>>>,
    shutdown: watch::Sender<bool>,
}

impl Default for GroupHub {
    fn default() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            groups: RwLock::new(HashMap::new()),
            shutdown,
        }
    }
}

impl GroupHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips to `true` once [`GroupHub::close_all`] has run.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Returns true when the connection was not already a member.
    pub async fn join(
        &self,
        channel: &ChannelName,
        connection: ConnectionId,
        inbox: InboxSender,
    ) -> bool {
        let mut groups = self.groups.write().await;
        let inserted = groups
            .entry(channel.clone())
            .or_default()
            .insert(connection, inbox)
            .is_none();
        debug!(channel = %channel, connection_id = %connection, inserted, "group join");
        inserted
    }

    /// Returns true when the connection was a member.
    pub async fn leave(&self, channel: &ChannelName, connection: ConnectionId) -> bool {
        let mut groups = self.groups.write().await;
        let removed = remove_member(&mut groups, channel, connection);
        debug!(channel = %channel, connection_id = %connection, removed, "group leave");
        removed
    }

    pub async fn leave_all<'a>(
        &self,
        connection: ConnectionId,
        channels: impl IntoIterator<Item = &'a ChannelName>,
    ) {
        let mut groups = self.groups.write().await;
        for channel in channels {
            remove_member(&mut groups, channel, connection);
        }
    }

    pub async fn publish(&self, event: StreamEvent) -> DeliveryReport {
        let event = Arc::new(event);
        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();

        {
            let groups = self.groups.read().await;
            let Some(members) = groups.get(&event.channel_name) else {
                return report;
            };
            report.recipients = members.len();
            for (connection, inbox) in members {
                match inbox.try_send(event.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        report.dropped += 1;
                        warn!(
                            channel = %event.channel_name,
                            connection_id = %connection,
                            "inbox full, dropping event for slow connection"
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        report.closed += 1;
                        closed.push(*connection);
                    }
                }
            }
        }

        if !closed.is_empty() {
            let mut groups = self.groups.write().await;
            if let Some(members) = groups.get_mut(&event.channel_name) {
                members.retain(|connection, inbox| {
                    !(closed.contains(connection) && inbox.is_closed())
                });
                if members.is_empty() {
                    groups.remove(&event.channel_name);
                }
            }
        }

        report
    }

    /// Drops every membership and signals connection loops to exit.
    pub async fn close_all(&self) {
        let mut groups = self.groups.write().await;
        groups.clear();
        self.shutdown.send_replace(true);
    }

    pub async fn is_member(&self, channel: &ChannelName, connection: ConnectionId) -> bool {
        let groups = self.groups.read().await;
        groups
            .get(channel)
            .map(|members| members.contains_key(&connection))
            .unwrap_or(false)
    }

    pub async fn member_count(&self, channel: &ChannelName) -> usize {
        let groups = self.groups.read().await;
        groups.get(channel).map(HashMap::len).unwrap_or(0)
    }

    pub async fn channel_count(&self) -> usize {
        self.groups.read().await.len()
    }

    pub async fn snapshot(&self) -> Vec<ChannelStat> {
        let groups = self.groups.read().await;
        let mut stats: Vec<ChannelStat> = groups
            .iter()
            .map(|(channel, members)| ChannelStat {
                channel_name: channel.clone(),
                members: members.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.channel_name.cmp(&b.channel_name));
        stats
    }
}

fn remove_member(
    groups: &mut HashMap<ChannelName, HashMap<ConnectionId, InboxSender>>,
    channel: &ChannelName,
    connection: ConnectionId,
) -> bool {
    let Some(members) = groups.get_mut(channel) else {
        return false;
    };
    let removed = members.remove(&connection).is_some();
    if members.is_empty() {
        groups.remove(channel);
    }
    removed
}
