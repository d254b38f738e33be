// Domain value objects
pub mod action_kind;
pub mod identifiers;
pub mod model_label;

pub use action_kind::*;
pub use identifiers::*;
pub use model_label::*;
