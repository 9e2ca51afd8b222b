use crate::handlers::JobResult;
use app_state::WorkerSettings;
use chrono::{Duration, Utc};
use color_eyre::{Report, Result};
use common_services::alert;
use common_services::database::jobs::Job;
use sqlx::PgPool;
use sqlx::postgres::PgQueryResult;
use tracing::{info, warn};

/// Atomically claims the next available job from the queue.
///
/// Running jobs whose heartbeat went stale belong to a crashed worker and are taken over.
///
/// # Errors
///
/// Returns an error if the database transaction fails.
pub async fn claim_next_job(
    pool: &PgPool,
    worker_id: &str,
    heartbeat_timeout_seconds: f64,
) -> Result<Option<Job>> {
    let mut tx = pool.begin().await?;

    let job = sqlx::query_as::<_, Job>(
        r"
        WITH candidate AS (
            SELECT id FROM jobs
            WHERE (status = 'queued' AND scheduled_at <= now())
               OR (status = 'running' AND last_heartbeat < now() - interval '1 second' * $2)
            ORDER BY priority, scheduled_at, created_at
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        UPDATE jobs
        SET status = 'running',
            owner = $1,
            started_at = now(),
            last_heartbeat = now(),
            attempts = CASE WHEN status = 'running' THEN attempts + 1 ELSE attempts END
        WHERE id = (SELECT id FROM candidate)
        RETURNING id, payload, upload_id, job_type, priority, attempts, max_attempts
        ",
    )
    .bind(worker_id)
    .bind(heartbeat_timeout_seconds)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(job)
}

/// Updates a job's status based on what its handler decided.
///
/// Only touches the job while `owner` still holds it.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn update_job_on_completion(
    pool: &PgPool,
    job: &Job,
    owner: &str,
    result: JobResult,
) -> Result<()> {
    match result {
        JobResult::Done => mark_job_done(pool, job.id, owner).await,
        JobResult::Retry {
            delay_seconds,
            reason,
        } => reschedule_for_retry(pool, job.id, owner, delay_seconds, &reason).await,
        JobResult::Failed(reason) => mark_job_failed(pool, job.id, owner, &reason).await,
    }
}

/// Updates a job's status after its handler errored, either marking it as failed or
/// rescheduling it.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn update_job_on_failure(
    pool: &PgPool,
    job: &Job,
    owner: &str,
    error: &Report,
    settings: &WorkerSettings,
) -> Result<()> {
    let error_string = &format!("{error:?}");
    if job.attempts + 1 >= job.max_attempts {
        mark_job_failed(pool, job.id, owner, error_string).await
    } else {
        let delay = settings.retry_backoff_seconds(job.attempts);
        reschedule_for_retry(pool, job.id, owner, delay, error_string).await
    }
}

fn warn_if_lost(result: &PgQueryResult, job_id: i64, owner: &str) {
    if result.rows_affected() == 0 {
        alert!("Job {job_id} is no longer held by {owner}, leaving it to its new owner.");
    }
}

async fn mark_job_done(pool: &PgPool, job_id: i64, owner: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE jobs SET status = 'done', finished_at = now(), last_error = NULL WHERE id = $1 AND owner = $2",
    )
    .bind(job_id)
    .bind(owner)
    .execute(pool)
    .await?;
    warn_if_lost(&result, job_id, owner);
    Ok(())
}

/// Marks a job as failed in the database.
///
/// # Errors
///
/// Returns an error if the database query fails.
async fn mark_job_failed(pool: &PgPool, job_id: i64, owner: &str, last_error: &str) -> Result<()> {
    alert!("‼️ Marking job {} as failed: {}", job_id, last_error);
    let result = sqlx::query(
        "UPDATE jobs SET status = 'failed', finished_at = now(), last_error = $3, attempts = attempts + 1 WHERE id = $1 AND owner = $2",
    )
    .bind(job_id)
    .bind(owner)
    .bind(last_error)
    .execute(pool)
    .await?;
    warn_if_lost(&result, job_id, owner);
    Ok(())
}

/// Reschedules a job to be tried again after a backoff period.
///
/// # Errors
///
/// Returns an error if the database query fails.
async fn reschedule_for_retry(
    pool: &PgPool,
    job_id: i64,
    owner: &str,
    backoff_secs: i64,
    last_error: &str,
) -> Result<()> {
    warn!("⚠️ Rescheduling job {job_id}. Backoff: {backoff_secs}s");
    info!("Last error of job {job_id}: {last_error}");
    let scheduled_at = Utc::now() + Duration::seconds(backoff_secs);
    let result = sqlx::query(
        "UPDATE jobs SET status = 'queued', scheduled_at = $3, attempts = attempts + 1, owner = NULL, started_at = NULL, last_error = $4 WHERE id = $1 AND owner = $2",
    )
    .bind(job_id)
    .bind(owner)
    .bind(scheduled_at)
    .bind(last_error)
    .execute(pool)
    .await?;
    warn_if_lost(&result, job_id, owner);
    Ok(())
}
