#![deny(clippy::unwrap_used)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_inception,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

pub mod api;
pub mod database;
pub mod irida_client;
pub mod job_queue;
pub mod manifest;
pub mod notifications;
pub mod status;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transfer;
pub mod utils;
