pub mod leaf_encoder;

pub use leaf_encoder::*;
