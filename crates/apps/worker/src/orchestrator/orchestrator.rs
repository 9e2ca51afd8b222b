use crate::handlers::JobResult;
use crate::orchestrator::{EventForwarder, UploadError, UploadOutcome};
use app_state::{UploadSettings, WorkerSettings};
use common_services::alert;
use common_services::database::UploadRepository;
use common_services::database::upload::Upload;
use common_services::irida_client::ProjectResolver;
use common_services::manifest::{ManifestOptions, prepare_sample_list, read_manifest};
use common_services::notifications::NotificationEmitter;
use common_services::status::{Reconciliation, StatusTracker};
use common_services::transfer::{TransferDriver, TransferEventSink};
use common_types::UploadStatus;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{error, info, warn};

/// What the failure handler decided for a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay_seconds: i64 },
    GiveUp,
}

/// Runs uploads end to end: manifest, project, transfer, status and notifications.
#[derive(Clone)]
pub struct UploadOrchestrator {
    uploads: Arc<dyn UploadRepository>,
    emitter: NotificationEmitter,
    resolver: ProjectResolver,
    driver: TransferDriver,
    tracker: StatusTracker,
    upload_settings: UploadSettings,
    worker_settings: WorkerSettings,
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

impl UploadOrchestrator {
    #[must_use]
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        emitter: NotificationEmitter,
        resolver: ProjectResolver,
        driver: TransferDriver,
        upload_settings: UploadSettings,
        worker_settings: WorkerSettings,
    ) -> Self {
        Self {
            uploads,
            emitter,
            resolver,
            driver,
            tracker: StatusTracker::new(upload_settings.status_file_name.clone()),
            upload_settings,
            worker_settings,
        }
    }

    /// Runs an upload under the soft and hard time limits and decides what the queue
    /// should do with the job afterwards.
    pub async fn execute(&self, upload_id: i64, force: bool) -> JobResult {
        let started = Instant::now();
        let soft_limit = Duration::from_secs(self.worker_settings.soft_time_limit_seconds);
        let hard_limit = Duration::from_secs(self.worker_settings.hard_time_limit_seconds);

        let outcome = match timeout(soft_limit, self.run(upload_id, force)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                alert!("Upload {upload_id} hit the soft time limit, cancelling the transfer.");
                UploadOutcome::Retryable(UploadError::SoftTimeLimit(soft_limit))
            }
        };

        let (error, retryable) = match outcome {
            UploadOutcome::Completed => return JobResult::Done,
            UploadOutcome::Fatal(e @ UploadError::UploadNotFound(_)) => {
                error!("{e}, nothing to do.");
                return JobResult::Failed(e.to_string());
            }
            UploadOutcome::Retryable(e) => (e, true),
            UploadOutcome::Fatal(e) => (e, false),
        };
        error!("Error processing upload {upload_id}: {error}");

        let remaining = hard_limit.saturating_sub(started.elapsed());
        match timeout(remaining, self.handle_failure(upload_id, retryable)).await {
            Ok(Ok(RetryDecision::Retry { delay_seconds })) => JobResult::Retry {
                delay_seconds,
                reason: error.to_string(),
            },
            Ok(Ok(RetryDecision::GiveUp)) => JobResult::Failed(error.to_string()),
            Ok(Err(db_error)) => {
                alert!("Could not record failure of upload {upload_id}: {db_error}");
                JobResult::Failed(format!("{error}; recording the failure failed: {db_error}"))
            }
            Err(_) => {
                alert!("Upload {upload_id} hit the hard time limit, abandoning it.");
                JobResult::Failed(format!("{error}; hard time limit exceeded"))
            }
        }
    }

    /// One attempt at uploading. Never retries by itself.
    pub async fn run(&self, upload_id: i64, force: bool) -> UploadOutcome {
        info!("Starting upload process for upload {upload_id}");
        let mut upload = match self.uploads.find_upload(upload_id).await {
            Ok(Some(upload)) => upload,
            Ok(None) => {
                error!("Upload {upload_id} not found");
                return UploadOutcome::Fatal(UploadError::UploadNotFound(upload_id));
            }
            Err(e) => return UploadOutcome::Retryable(e.into()),
        };
        let owner = match self.uploads.find_user(upload.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return UploadOutcome::Fatal(UploadError::OwnerNotFound(upload.user_id)),
            Err(e) => return UploadOutcome::Retryable(e.into()),
        };

        upload.status = UploadStatus::Uploading;
        upload = match self.uploads.save_upload(&upload).await {
            Ok(saved) => saved,
            Err(e) => return UploadOutcome::Retryable(e.into()),
        };

        let forwarder = EventForwarder::start(self.emitter.clone(), owner.id, upload.id);
        let result = self
            .upload_folder(&mut upload, &owner.email, force, &forwarder)
            .await;
        forwarder.finish().await;

        result.into()
    }

    async fn upload_folder(
        &self,
        upload: &mut Upload,
        owner_email: &str,
        force: bool,
        sink: &dyn TransferEventSink,
    ) -> Result<(), UploadError> {
        let directory = self
            .upload_settings
            .folder_dir(owner_email, &upload.folder_name);
        info!("Processing files in directory: {}", directory.display());
        if !directory.is_dir() {
            return Err(UploadError::FolderNotFound(directory));
        }

        let continue_partial = match self.tracker.reconcile(upload, &directory, force) {
            Reconciliation::AlreadyComplete => {
                upload.status = UploadStatus::Success;
                *upload = self.uploads.save_upload(upload).await?;
                self.emitter.already_completed(upload).await;
                return Ok(());
            }
            Reconciliation::Resume { .. } => true,
            Reconciliation::Fresh => false,
        };

        self.prepare_manifest(upload, &directory, continue_partial)
            .await?;
        *upload = self.uploads.save_upload(upload).await?;

        let report = self
            .driver
            .transfer(&directory, force, continue_partial, sink)
            .await?;
        self.tracker.refresh(upload, &directory);

        if report.succeeded() {
            upload.status = UploadStatus::Success;
            *upload = self.uploads.save_upload(upload).await?;
            info!(
                "Upload {} completed with {} samples",
                upload.id, upload.sample_count
            );
            self.emitter.upload_succeeded(upload).await;
            Ok(())
        } else {
            *upload = self.uploads.save_upload(upload).await?;
            Err(UploadError::TransferNonZeroExit {
                exit_code: report.exit_code,
                details: report.details,
            })
        }
    }

    /// Reuses the folder's manifest if it has one, otherwise builds it and resolves the
    /// project.
    async fn prepare_manifest(
        &self,
        upload: &mut Upload,
        directory: &Path,
        continue_partial: bool,
    ) -> Result<(), UploadError> {
        let manifest_path = self.upload_settings.manifest_path(directory);
        let existing = match read_manifest(&manifest_path) {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Rebuilding unusable manifest: {e}");
                None
            }
        };

        if let Some(manifest) = existing {
            if let Some(project_id) = manifest.project_id {
                info!(
                    "Reusing manifest {} for project {project_id}",
                    manifest_path.display()
                );
                upload.remote_project_id = Some(project_id);
                if !continue_partial {
                    upload.sample_count = count(manifest.entries.len());
                }
                return Ok(());
            }
        }

        let options = ManifestOptions {
            project_id: None,
            project_name: upload.project_name.clone(),
            paired_end: self.upload_settings.paired_end,
            sort: self.upload_settings.sort_manifest,
        };
        let prepared = prepare_sample_list(
            directory,
            &manifest_path,
            &options,
            &self.resolver,
            &self.upload_settings.project_name_prefix,
        )
        .await?;
        upload.remote_project_id = Some(prepared.project_id);
        if !continue_partial {
            upload.sample_count = count(prepared.sample_count);
        }
        Ok(())
    }

    /// Marks the upload failed and decides whether it gets another go.
    pub async fn handle_failure(
        &self,
        upload_id: i64,
        retryable: bool,
    ) -> Result<RetryDecision, common_services::database::DbError> {
        let Some(mut upload) = self.uploads.find_upload(upload_id).await? else {
            error!("Upload {upload_id} not found when handling error");
            return Ok(RetryDecision::GiveUp);
        };
        upload.status = UploadStatus::Failed;

        if retryable && upload.retry_count < self.worker_settings.max_retries {
            let delay_seconds = self.worker_settings.retry_backoff_seconds(upload.retry_count);
            upload.retry_count += 1;
            self.uploads.save_upload(&upload).await?;
            warn!(
                "Upload {upload_id} failed, retry {} of {} in {delay_seconds}s",
                upload.retry_count, self.worker_settings.max_retries
            );
            return Ok(RetryDecision::Retry { delay_seconds });
        }

        let upload = self.uploads.save_upload(&upload).await?;
        if retryable {
            alert!("Upload {upload_id} failed after {} retries.", upload.retry_count);
            self.emitter.retries_exhausted(&upload).await;
        } else {
            self.emitter.upload_failed(&upload).await;
        }
        Ok(RetryDecision::GiveUp)
    }
}
