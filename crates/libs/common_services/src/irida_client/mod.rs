pub mod client;
pub mod error;
pub mod interfaces;
pub mod resolver;

pub use client::*;
pub use error::*;
pub use interfaces::*;
pub use resolver::*;
