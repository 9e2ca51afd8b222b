pub mod artifact;
pub mod tracker;

pub use artifact::*;
pub use tracker::*;
