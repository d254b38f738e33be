use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use relay_domain::{MissingEntityPolicy, RuntimeConfig};

use crate::config::validation::{validate_capacity, validate_upstream_url};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
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

impl Default for AppConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        Self {
            bind_addr: runtime.bind_addr,
            api_token: runtime.api_token,
            signing_secret: runtime.signing_secret,
            signing_salt: runtime.signing_salt,
            models_path: runtime.models_path,
            template_dir: runtime.template_dir,
            connection_queue_capacity: runtime.connection_queue_capacity,
            outbound_queue_capacity: runtime.outbound_queue_capacity,
            missing_entity_policy: runtime.missing_entity_policy,
            emit_error_frames: runtime.emit_error_frames,
            upstream_event_urls: runtime.upstream_event_urls,
            upstream_event_token: runtime.upstream_event_token,
            max_body_bytes: runtime.max_body_bytes,
            request_timeout_seconds: runtime.request_timeout_seconds,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("RELAY_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str::<AppConfig>(&content)
                .map_err(|err| anyhow!("invalid config {}: {}", path, err))?
        } else {
            warn!(path = %path, "config file not found, using defaults");
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.api_token = normalize_optional(self.api_token.take());
        self.upstream_event_token = normalize_optional(self.upstream_event_token.take());
        self.signing_secret = self.signing_secret.trim().to_string();
        self.signing_salt = self.signing_salt.trim().to_string();
        self.upstream_event_urls =
            normalize_list(std::mem::take(&mut self.upstream_event_urls));
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.models_path = resolve_path(base, &self.models_path);
        self.template_dir = resolve_path(base, &self.template_dir);
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.signing_secret.is_empty() {
            return Err(anyhow!("signing_secret must not be empty"));
        }
        if self.signing_salt.is_empty() {
            return Err(anyhow!("signing_salt must not be empty"));
        }
        validate_capacity(self.connection_queue_capacity, "connection_queue_capacity")?;
        validate_capacity(self.outbound_queue_capacity, "outbound_queue_capacity")?;
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }
        for url in &self.upstream_event_urls {
            validate_upstream_url(url)?;
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            signing_secret: self.signing_secret.clone(),
            signing_salt: self.signing_salt.clone(),
            models_path: self.models_path.clone(),
            template_dir: self.template_dir.clone(),
            connection_queue_capacity: self.connection_queue_capacity,
            outbound_queue_capacity: self.outbound_queue_capacity,
            missing_entity_policy: self.missing_entity_policy,
            emit_error_frames: self.emit_error_frames,
            upstream_event_urls: self.upstream_event_urls.clone(),
            upstream_event_token: self.upstream_event_token.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("RELAY_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("RELAY_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("RELAY_SIGNING_SECRET") {
            self.signing_secret = value;
        }
        if let Ok(value) = env::var("RELAY_SIGNING_SALT") {
            self.signing_salt = value;
        }
        if let Ok(value) = env::var("RELAY_MODELS_PATH") {
            self.models_path = value;
        }
        if let Ok(value) = env::var("RELAY_TEMPLATE_DIR") {
            self.template_dir = value;
        }
        if let Ok(value) = env::var("RELAY_CONNECTION_QUEUE_CAPACITY") {
            self.connection_queue_capacity =
                value.parse().unwrap_or(self.connection_queue_capacity);
        }
        if let Ok(value) = env::var("RELAY_OUTBOUND_QUEUE_CAPACITY") {
            self.outbound_queue_capacity = value.parse().unwrap_or(self.outbound_queue_capacity);
        }
        if let Ok(value) = env::var("RELAY_MISSING_ENTITY_POLICY") {
            match value.parse() {
                Ok(policy) => self.missing_entity_policy = policy,
                Err(err) => warn!("ignoring RELAY_MISSING_ENTITY_POLICY: {}", err),
            }
        }
        if let Ok(value) = env::var("RELAY_EMIT_ERROR_FRAMES") {
            self.emit_error_frames = value.parse().unwrap_or(self.emit_error_frames);
        }
        if let Ok(value) = env::var("RELAY_UPSTREAM_EVENT_URLS") {
            self.upstream_event_urls = parse_env_list(&value);
        }
        if let Ok(value) = env::var("RELAY_UPSTREAM_EVENT_TOKEN") {
            self.upstream_event_token = Some(value);
        }
        if let Ok(value) = env::var("RELAY_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("RELAY_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_env_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn normalize_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for item in values {
        let item = item.trim().to_string();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
