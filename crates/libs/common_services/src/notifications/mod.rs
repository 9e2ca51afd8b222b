pub mod emitter;
pub mod mailer;
pub mod messages;
pub mod queue;

pub use emitter::*;
pub use mailer::*;
pub use queue::*;
