use thiserror::Error;

use relay_domain::{DomainError, ModelLabel, RequestId};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("no subscription for request id '{0}'")]
    SubscriptionNotFound(RequestId),
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("{model} with pk '{pk}' does not exist")]
    EntityNotFound { model: ModelLabel, pk: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DomainError> for AppError {
    fn from(value: DomainError) -> Self {
        AppError::BadRequest(value.to_string())
    }
}
