pub mod error;
pub use error::*;

pub mod sample_dir;
pub use sample_dir::*;

pub(crate) mod util;
