use crate::context::WorkerContext;
use crate::handlers::handle_job;
use crate::jobs::management::{claim_next_job, update_job_on_completion, update_job_on_failure};
use app_state::AppSettings;
use color_eyre::Result;
use common_services::utils::nice_id;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info};

/// Starts `worker.concurrency` claim loops sharing one context.
///
/// # Errors
///
/// Returns the first error a loop stops with.
pub async fn create_worker(pool: PgPool, settings: AppSettings, stop_on_sleep: bool) -> Result<()> {
    let worker_id = nice_id(8);
    let concurrency = settings.worker.concurrency.max(1);
    info!("🛠️ [Worker ID: {worker_id}] Starting with {concurrency} slots.");
    let context = Arc::new(WorkerContext::new(pool, settings, worker_id)?);

    let mut loops = JoinSet::new();
    for slot in 0..concurrency {
        let context = context.clone();
        loops.spawn(async move { run_worker_loop(&context, slot, stop_on_sleep).await });
    }

    while let Some(joined) = loops.join_next().await {
        if let Err(e) = joined? {
            error!("Worker loop stopped: {e:?}");
            loops.abort_all();
            return Err(e);
        }
    }
    Ok(())
}

/// The main loop for one worker slot, continuously fetching and processing jobs.
///
/// # Errors
///
/// This function will return an error if there is a problem communicating with the
/// database when claiming or updating a job. The loop will terminate in such a case.
pub async fn run_worker_loop(context: &WorkerContext, slot: usize, stop_on_sleep: bool) -> Result<()> {
    let worker_settings = &context.settings.worker;
    let owner = format!("{}-{slot}", context.worker_id);
    let mut sleeping = false;

    loop {
        let maybe_job = claim_next_job(
            &context.pool,
            &owner,
            worker_settings.heartbeat_timeout_seconds,
        )
        .await?;

        if let Some(job) = maybe_job {
            sleeping = false;
            info!(
                "🐜 [{owner}] Picked up {:?} job {} (upload: {:?})",
                job.job_type, job.id, job.upload_id
            );

            match handle_job(context, &job, &owner).await {
                Ok(result) => update_job_on_completion(&context.pool, &job, &owner, result).await?,
                Err(e) => {
                    update_job_on_failure(&context.pool, &job, &owner, &e, worker_settings).await?;
                }
            }
        } else {
            if !sleeping {
                sleeping = true;
                info!("💤 [{owner}] No jobs, going to sleep...");
                if stop_on_sleep {
                    return Ok(());
                }
            }
            sleep(Duration::from_millis(worker_settings.poll_interval_ms)).await;
        }
    }
}
