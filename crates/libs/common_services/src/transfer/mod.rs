pub mod command;
pub mod driver;
pub mod error;
pub mod events;

pub use command::*;
pub use driver::*;
pub use error::*;
pub use events::*;
