pub mod error;
pub mod matrix;

pub use error::{ModelError, ModelResult};
pub use matrix::{LeafMatrix, Matrix};
