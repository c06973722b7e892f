pub mod criteria;
pub mod levermann;
pub mod market;
pub mod quotes;

pub use levermann::{compute_ratings, Levermann};
