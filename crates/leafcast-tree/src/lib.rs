pub mod booster;
pub mod regression_tree;

pub use booster::*;
pub use regression_tree::*;
