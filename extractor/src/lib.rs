// exported modules
pub mod atcoder;
pub mod detect;
pub mod model;

// re-exports
pub use atcoder::extract;
pub use detect::looks_like_problem_markup;
pub use model::*;

// internal modules
mod util;
