// Domain services
pub mod dom_target;

pub use dom_target::*;
