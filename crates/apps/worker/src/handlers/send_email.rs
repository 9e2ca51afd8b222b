use crate::context::WorkerContext;
use crate::handlers::JobResult;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use common_services::database::jobs::Job;
use common_types::EmailPayload;
use tracing::info;

pub async fn handle(context: &WorkerContext, job: &Job) -> Result<JobResult> {
    let payload = job
        .payload
        .clone()
        .ok_or_else(|| eyre!("Email job {} has no payload", job.id))?;
    let email: EmailPayload = serde_json::from_value(payload)?;

    context.mailer.send(&email).await?;
    info!("Email notification sent to {}", email.recipient);
    Ok(JobResult::Done)
}
