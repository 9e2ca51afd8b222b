use app_state::AppSettings;
use color_eyre::Result;
use common_services::database::PgRepository;
use common_services::job_queue::PgJobQueue;
use common_services::notifications::NotificationEmitter;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// Builds the emitter the periodic tasks work through.
#[must_use]
pub fn queue_emitter(pool: &PgPool, settings: &AppSettings) -> NotificationEmitter {
    let repository = Arc::new(PgRepository::new(
        pool.clone(),
        settings.worker.heartbeat_timeout_seconds,
    ));
    let jobs = Arc::new(PgJobQueue::new(
        pool.clone(),
        settings.worker.email_max_attempts,
    ));
    NotificationEmitter::new(
        repository.clone(),
        repository,
        jobs,
        settings.worker.concurrency,
    )
}

/// Refreshes the queue position notices of waiting uploads, forever.
///
/// # Errors
///
/// Never returns under normal operation. A failed refresh is logged and retried on the
/// next tick.
pub async fn run_tasks(pool: PgPool, settings: AppSettings) -> Result<()> {
    let every = Duration::from_secs(settings.notifications.queue_refresh_seconds.max(1));
    let emitter = queue_emitter(&pool, &settings);
    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    info!("Refreshing queue notifications every {}s", every.as_secs());

    loop {
        // The first tick of `interval` happens immediately.
        interval.tick().await;
        match emitter.refresh_queue_notifications().await {
            Ok(0) => {}
            Ok(n) => info!("Updated queue position of {n} uploads"),
            Err(e) => error!("Queue notification refresh failed: {e}"),
        }
    }
}
