pub mod model_files;

pub use model_files::*;
