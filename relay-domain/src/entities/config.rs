// Runtime configuration handed to the application layer

use serde::{Deserialize, Serialize};

/// What a connection does when an event references an entity that no longer
/// exists in its store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingEntityPolicy {
    /// Fail the delivery and close the connection.
    #[default]
    Fail,
    /// Log and deliver nothing for that event.
    Skip,
}

impl MissingEntityPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingEntityPolicy::Fail => "fail",
            MissingEntityPolicy::Skip => "skip",
        }
    }
}

impl std::str::FromStr for MissingEntityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(MissingEntityPolicy::Fail),
            "skip" => Ok(MissingEntityPolicy::Skip),
            other => Err(format!("unknown missing_entity_policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub signing_secret: String,
    pub signing_salt: String,
    pub models_path: String,
    pub template_dir: String,
    pub connection_queue_capacity: usize,
    pub outbound_queue_capacity: usize,
    pub missing_entity_policy: MissingEntityPolicy,
    pub emit_error_frames: bool,
    pub upstream_event_urls: Vec<String>,
    pub upstream_event_token: Option<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            signing_secret: String::new(),
            signing_salt: "turbo.channels".to_string(),
            models_path: "./models.yaml".to_string(),
            template_dir: "./templates".to_string(),
            connection_queue_capacity: 64,
            outbound_queue_capacity: 256,
            missing_entity_policy: MissingEntityPolicy::Fail,
            emit_error_frames: false,
            upstream_event_urls: Vec::new(),
            upstream_event_token: None,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 15,
        }
    }
}
