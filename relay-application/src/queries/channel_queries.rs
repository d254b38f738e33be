use chrono::Utc;
use serde::Serialize;

use crate::ops::group_hub::ChannelStat;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ChannelOverview {
    pub generated_at: String,
    pub active_connections: u64,
    pub models: Vec<String>,
    pub channels: Vec<ChannelStat>,
}

pub async fn channel_overview(state: &AppState) -> ChannelOverview {
    ChannelOverview {
        generated_at: Utc::now().to_rfc3339(),
        active_connections: state.metrics.active_connections(),
        models: state.models.labels(),
        channels: state.hub.snapshot().await,
    }
}
