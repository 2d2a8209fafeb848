pub mod csv_io;
pub mod model_io;

pub use csv_io::*;
pub use model_io::*;
