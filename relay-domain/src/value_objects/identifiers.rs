// Identifier value objects

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::value_objects::ModelLabel;

/// Group names longer than this are rejected by the channel layer.
pub const MAX_CHANNEL_NAME_LEN: usize = 99;

/// Broadcast topic a connection can join.
///
/// Restricted to ASCII alphanumerics, `-`, `_` and `.` so that a name is
/// always usable as a group key on any channel layer backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let value = raw.into();
        if value.is_empty() || value.len() > MAX_CHANNEL_NAME_LEN {
            return Err(DomainError::InvalidChannelName(value));
        }
        if !value.chars().all(is_channel_char) {
            return Err(DomainError::InvalidChannelName(value));
        }
        Ok(Self(value))
    }

    /// Channel shared by every instance of a model, e.g. `blog.post`.
    pub fn for_model(label: &ModelLabel) -> Self {
        Self(label.to_string())
    }

    /// Channel dedicated to one instance, e.g. `blog.post-42`.
    pub fn for_instance(label: &ModelLabel, pk: &str) -> Result<Self, DomainError> {
        Self::parse(format!("{}-{}", label, pk.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_channel_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')
}

impl TryFrom<String> for ChannelName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ChannelName> for String {
    fn from(value: ChannelName) -> Self {
        value.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-side correlation token; opaque to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
