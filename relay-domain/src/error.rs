use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid channel name: {0}")]
    InvalidChannelName(String),
    #[error("invalid model label: {0}")]
    InvalidModelLabel(String),
}
