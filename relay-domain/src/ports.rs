// Port traits (interfaces)
// Define what the relay core needs from storage and templating

pub mod repositories;
pub mod services;

pub use repositories::*;
pub use services::*;
