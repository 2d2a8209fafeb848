pub mod classifier;
pub mod config;

pub use classifier::*;
pub use config::*;
