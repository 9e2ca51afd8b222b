#![allow(
    clippy::cognitive_complexity,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_inception
)]

pub mod context;
pub mod handlers;
pub mod jobs;
pub mod orchestrator;
pub mod worker;
