// Channel signing DTOs

use serde::{Deserialize, Serialize};

/// Either an explicit channel name, or a model label with an optional pk
/// that is expanded with the channel naming convention.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelSignRequest {
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub pk: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSignResponse {
    pub channel_name: String,
    pub signed_channel_name: String,
}
