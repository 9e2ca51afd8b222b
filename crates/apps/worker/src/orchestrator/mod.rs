pub mod event_forwarder;
pub mod orchestrator;
pub mod outcome;

pub use event_forwarder::*;
pub use orchestrator::*;
pub use outcome::*;
