// Relay Application Layer

pub mod commands;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ops;
pub mod queries;
pub mod signing;
pub mod state;
pub mod subscriptions;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::ConnectionSession;
pub use dispatch::EventDispatcher;
pub use error::AppError;
pub use metrics::Metrics;
pub use models::{ModelRegistry, RegisteredModel};
pub use ops::group_hub::{EventInbox, GroupHub};
pub use signing::ChannelSigner;
pub use state::AppState;
pub use subscriptions::SubscriptionRegistry;
