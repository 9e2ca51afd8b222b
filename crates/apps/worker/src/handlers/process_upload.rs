use crate::context::WorkerContext;
use crate::handlers::JobResult;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use common_services::database::jobs::Job;
use common_types::ProcessUploadPayload;

pub async fn handle(context: &WorkerContext, job: &Job) -> Result<JobResult> {
    let payload = job
        .payload
        .clone()
        .ok_or_else(|| eyre!("Process upload job {} has no payload", job.id))?;
    let payload: ProcessUploadPayload = serde_json::from_value(payload)?;

    Ok(context
        .orchestrator
        .execute(payload.upload_id, payload.force)
        .await)
}
