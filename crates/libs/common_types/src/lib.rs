#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
mod notification;
mod upload;
mod worker_payload;

pub use notification::*;
pub use upload::*;
pub use worker_payload::*;
