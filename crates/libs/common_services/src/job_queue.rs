use crate::database::DbError;
use crate::database::jobs::JobType;
use async_trait::async_trait;
use bon::builder;
use common_types::{EmailPayload, ProcessUploadPayload};
use serde::Serialize;
use serde_json::to_value;
use sqlx::PgPool;
use tracing::{info, warn};

/// Enqueues a job. Returns the new job id, or `None` if an active job for the same
/// upload already exists.
///
/// # Errors
///
/// Returns an error if the payload can't be serialized or the insert fails.
#[builder]
pub async fn enqueue_job<T: Serialize + Send + Sync>(
    #[builder(start_fn)] pool: &PgPool,
    #[builder(start_fn)] job_type: JobType,
    upload_id: Option<i64>,
    payload: Option<&T>,
    max_attempts: Option<i32>,
) -> Result<Option<i64>, DbError> {
    let json_payload = payload.map(to_value).transpose()?;
    let priority = job_type.get_priority();

    let job_id = sqlx::query_scalar::<_, i64>(
        r"
        INSERT INTO jobs (job_type, upload_id, priority, payload, max_attempts)
        VALUES ($1, $2, $3, $4, COALESCE($5, 3))
        -- THIS PART MUST MATCH THE INDEX DEFINITION EXACTLY
        ON CONFLICT (upload_id) WHERE job_type = 'process_upload' AND status IN ('queued', 'running')
        DO NOTHING
        RETURNING id
        ",
    )
    .bind(job_type)
    .bind(upload_id)
    .bind(priority)
    .bind(&json_payload)
    .bind(max_attempts)
    .fetch_optional(pool)
    .await?;

    if job_id.is_none() {
        warn!(
            "Not enqueueing {:?} job for upload {:?}, an active one already exists.",
            job_type, upload_id
        );
        return Ok(None);
    }

    info!(
        "Enqueued {:?} job {:?}, upload_id: {:?}",
        job_type, job_id, upload_id
    );
    Ok(job_id)
}

/// Where the entry points and the notification emitter hand off background work.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Schedules an orchestrator run. `None` means one is already queued or running.
    async fn enqueue_upload(&self, payload: &ProcessUploadPayload) -> Result<Option<i64>, DbError>;

    async fn enqueue_email(&self, payload: &EmailPayload) -> Result<Option<i64>, DbError>;
}

#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    email_max_attempts: i32,
}

impl PgJobQueue {
    #[must_use]
    pub const fn new(pool: PgPool, email_max_attempts: i32) -> Self {
        Self {
            pool,
            email_max_attempts,
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue_upload(&self, payload: &ProcessUploadPayload) -> Result<Option<i64>, DbError> {
        // Upload retries are counted on the upload itself, the queue never gives up on its own.
        enqueue_job(&self.pool, JobType::ProcessUpload)
            .upload_id(payload.upload_id)
            .payload(payload)
            .max_attempts(i32::MAX)
            .call()
            .await
    }

    async fn enqueue_email(&self, payload: &EmailPayload) -> Result<Option<i64>, DbError> {
        enqueue_job(&self.pool, JobType::SendEmail)
            .payload(payload)
            .max_attempts(self.email_max_attempts)
            .call()
            .await
    }
}
