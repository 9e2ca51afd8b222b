use crate::orchestrator::UploadOrchestrator;
use app_state::AppSettings;
use color_eyre::Result;
use common_services::database::PgRepository;
use common_services::irida_client::{IridaClient, ProjectResolver};
use common_services::job_queue::PgJobQueue;
use common_services::notifications::{LogMailer, Mailer, NotificationEmitter};
use common_services::transfer::{CommandTransport, TransferDriver};
use sqlx::PgPool;
use std::sync::Arc;

pub struct WorkerContext {
    pub worker_id: String,
    pub pool: PgPool,
    pub settings: AppSettings,
    pub orchestrator: UploadOrchestrator,
    pub mailer: Arc<dyn Mailer>,
}

impl WorkerContext {
    /// Wires the production collaborators: Postgres, the remote REST API and the uploader tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for the remote repository can't be built.
    pub fn new(pool: PgPool, settings: AppSettings, worker_id: String) -> Result<Self> {
        let repository = Arc::new(PgRepository::new(
            pool.clone(),
            settings.worker.heartbeat_timeout_seconds,
        ));
        let jobs = Arc::new(PgJobQueue::new(
            pool.clone(),
            settings.worker.email_max_attempts,
        ));
        let emitter = NotificationEmitter::new(
            repository.clone(),
            repository.clone(),
            jobs,
            settings.worker.concurrency,
        );
        let resolver = ProjectResolver::new(Arc::new(IridaClient::new(settings.remote.clone())?));
        let driver = TransferDriver::new(
            Arc::new(CommandTransport::new(
                &settings.transfer,
                settings.remote.clone(),
            )),
            settings.transfer.upload_mode.clone(),
        );
        let orchestrator = UploadOrchestrator::new(
            repository,
            emitter,
            resolver,
            driver,
            settings.uploads.clone(),
            settings.worker.clone(),
        );

        Ok(Self {
            worker_id,
            pool,
            mailer: Arc::new(LogMailer::new(settings.email.from_address.clone())),
            settings,
            orchestrator,
        })
    }
}
