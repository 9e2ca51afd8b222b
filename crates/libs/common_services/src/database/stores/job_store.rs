use crate::database::DbError;
use sqlx::{Executor, Postgres};

pub struct JobStore;

impl JobStore {
    /// Whether an orchestrator job for the upload is queued, or running with a fresh heartbeat.
    pub async fn has_live_upload_job(
        executor: impl Executor<'_, Database = Postgres>,
        upload_id: i64,
        heartbeat_timeout_seconds: f64,
    ) -> Result<bool, DbError> {
        Ok(sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM jobs
                WHERE upload_id = $1
                  AND job_type = 'process_upload'
                  AND (status = 'queued'
                    OR (status = 'running' AND last_heartbeat > now() - interval '1 second' * $2))
            )
            ",
        )
        .bind(upload_id)
        .bind(heartbeat_timeout_seconds)
        .fetch_one(executor)
        .await?)
    }
}
