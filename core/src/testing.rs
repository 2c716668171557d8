pub mod batch;
pub mod result;
pub mod runner;
pub mod testcase;

pub use batch::*;
pub use result::*;
pub use runner::*;
pub use testcase::*;
