// Domain entities
pub mod config;
pub mod event;
pub mod messages;
pub mod model;
pub mod signing;

pub use config::*;
pub use event::*;
pub use messages::*;
pub use model::*;
pub use signing::*;
