use crate::context::WorkerContext;
use crate::jobs::heartbeat::start_heartbeat_loop;
use color_eyre::Result;
use common_services::database::jobs::{Job, JobType};
use std::time::Duration;

pub mod process_upload;
pub mod send_email;

/// The outcome of a job handler's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Done,
    /// Run the job again after `delay_seconds`.
    Retry { delay_seconds: i64, reason: String },
    /// Stop for good.
    Failed(String),
}

/// Dispatches a job to its corresponding handler and keeps its heartbeat alive meanwhile.
///
/// # Errors
///
/// Returns an error if the payload can't be read or the handler fails unexpectedly. The
/// queue then retries the job up to its `max_attempts`.
pub async fn handle_job(context: &WorkerContext, job: &Job, owner: &str) -> Result<JobResult> {
    let heartbeat_handle = start_heartbeat_loop(
        &context.pool,
        job.id,
        owner,
        Duration::from_secs(context.settings.worker.heartbeat_interval_seconds),
    );

    let result = match job.job_type {
        JobType::ProcessUpload => process_upload::handle(context, job).await,
        JobType::SendEmail => send_email::handle(context, job).await,
    };

    heartbeat_handle.abort();
    result
}
