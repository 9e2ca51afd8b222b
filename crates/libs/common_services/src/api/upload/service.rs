//! Entry points for submitting uploads and looking at their progress.

use crate::api::upload::{
    SubmitUploadRequest, SubmitUploadResponse, UploadApiError, UploadStatusReport,
};
use crate::database::upload::{NewUpload, Upload};
use crate::database::UploadRepository;
use crate::job_queue::JobQueue;
use crate::notifications::{NotificationEmitter, QueueInfo};
use crate::status::{ArtifactState, StatusTracker};
use app_state::{UploadSettings, relative_posix};
use common_types::{NotificationKind, ProcessUploadPayload, UploadStatus};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Clone)]
pub struct UploadService {
    uploads: Arc<dyn UploadRepository>,
    jobs: Arc<dyn JobQueue>,
    emitter: NotificationEmitter,
    tracker: StatusTracker,
    settings: UploadSettings,
}

fn validate_folder_name(folder_name: &str) -> Result<(), UploadApiError> {
    if folder_name.trim().is_empty() {
        return Err(UploadApiError::MissingFolderName);
    }
    let escapes = Path::new(folder_name).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        warn!("Blocked directory traversal attempt for folder: {folder_name}");
        return Err(UploadApiError::InvalidFolderName(folder_name.to_owned()));
    }
    Ok(())
}

/// The last `limit` non-empty lines of a text file, or nothing if it doesn't exist.
fn tail_lines(path: &Path, limit: usize) -> Result<Vec<String>, UploadApiError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let content = String::from_utf8_lossy(&bytes);
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect();
    let skip = lines.len().saturating_sub(limit);
    Ok(lines.into_iter().skip(skip).collect())
}

impl UploadService {
    #[must_use]
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        jobs: Arc<dyn JobQueue>,
        emitter: NotificationEmitter,
        settings: UploadSettings,
    ) -> Self {
        Self {
            uploads,
            jobs,
            emitter,
            tracker: StatusTracker::new(settings.status_file_name.clone()),
            settings,
        }
    }

    /// The staging directory of a user, created on first use.
    fn user_dir(&self, email: &str) -> Result<PathBuf, UploadApiError> {
        let dir = self.settings.user_dir(email);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn resolve_folder(&self, email: &str, folder_name: &str) -> Result<PathBuf, UploadApiError> {
        validate_folder_name(folder_name)?;
        let user_dir = self.user_dir(email)?;
        let directory = user_dir.join(folder_name);
        if !directory.is_dir() {
            warn!("Folder does not exist: {}", directory.display());
            return Err(UploadApiError::FolderNotFound(folder_name.to_owned()));
        }

        // Symlinks may still lead elsewhere.
        if !directory.canonicalize()?.starts_with(user_dir.canonicalize()?) {
            warn!("Blocked symlink escape for folder: {folder_name}");
            return Err(UploadApiError::InvalidFolderName(folder_name.to_owned()));
        }
        Ok(directory)
    }

    async fn owner_email(&self, user_id: i32) -> Result<String, UploadApiError> {
        self.uploads
            .find_user(user_id)
            .await?
            .map(|u| u.email)
            .ok_or(UploadApiError::UserNotFound(user_id))
    }

    async fn owned_upload(&self, user_id: i32, upload_id: i64) -> Result<Upload, UploadApiError> {
        self.uploads
            .find_upload(upload_id)
            .await?
            .filter(|u| u.user_id == user_id)
            .ok_or(UploadApiError::UploadNotFound(upload_id))
    }

    /// Validates a folder and, unless it was uploaded already, queues it for upload.
    pub async fn submit_upload(
        &self,
        request: SubmitUploadRequest,
    ) -> Result<SubmitUploadResponse, UploadApiError> {
        let email = self.owner_email(request.user_id).await?;
        let directory = self.resolve_folder(&email, &request.folder_name)?;
        info!("Processing upload for folder: {}", directory.display());

        if !request.force {
            if let Some(record) = self.tracker.read(&directory) {
                if record.upload_state == ArtifactState::Complete {
                    let sample_count = record.total_samples();
                    info!("Found previous upload with {sample_count} samples");
                    return Ok(SubmitUploadResponse::Warning {
                        message: format!(
                            "This folder has already been uploaded with {sample_count} samples. Do you want to upload again?"
                        ),
                        sample_count,
                        project_id: record.first_project_id().map(str::to_owned),
                        needs_force: true,
                    });
                }
            }
        }

        if request.check_only {
            return Ok(SubmitUploadResponse::Ok);
        }

        let project_name = request
            .project_name
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());
        let mut upload = self
            .uploads
            .create_upload(NewUpload {
                user_id: request.user_id,
                folder_name: request.folder_name,
                project_name,
            })
            .await?;

        let enqueued = self
            .jobs
            .enqueue_upload(&ProcessUploadPayload {
                upload_id: upload.id,
                force: request.force,
            })
            .await;
        let job_id = match enqueued {
            Ok(job_id) => job_id,
            Err(e) => {
                // Without a job nothing would ever pick the upload up, keep it out of the queue.
                error!("Could not queue upload {}: {e}", upload.id);
                upload.status = UploadStatus::Failed;
                if let Err(save_error) = self.uploads.save_upload(&upload).await {
                    error!("Could not mark unqueued upload {} failed: {save_error}", upload.id);
                }
                return Err(e.into());
            }
        };
        upload.task_handle = job_id.map(|id| id.to_string());
        let upload = self.uploads.save_upload(&upload).await?;
        info!(
            "Queued upload {} with job {:?}",
            upload.id, upload.task_handle
        );

        self.emitter.notify(&upload, NotificationKind::Info).await;

        Ok(SubmitUploadResponse::Submitted {
            upload_id: upload.id,
            task_handle: upload.task_handle,
        })
    }

    /// Current state of an upload, refreshed from the folder's status artifact.
    pub async fn get_upload_status(
        &self,
        user_id: i32,
        upload_id: i64,
    ) -> Result<UploadStatusReport, UploadApiError> {
        let email = self.owner_email(user_id).await?;
        let upload = self.owned_upload(user_id, upload_id).await?;
        let directory = self.settings.folder_dir(&email, &upload.folder_name);

        let orphaned = upload.status == UploadStatus::Uploading
            && !self.uploads.has_live_job(upload.id).await?;
        let mut reconciled = upload.clone();
        if orphaned {
            warn!("Upload {} is uploading but no worker holds it", upload.id);
            self.tracker.settle_orphaned(&mut reconciled, &directory);
        } else if upload.status != UploadStatus::Submitted {
            // A fresh submission hasn't produced an artifact of its own yet.
            self.tracker.refresh(&mut reconciled, &directory);
        }
        let upload = if reconciled == upload {
            upload
        } else {
            self.uploads.save_upload(&reconciled).await?
        };

        let logs = tail_lines(
            &self.settings.log_path(&directory),
            self.settings.log_tail_lines,
        )?;
        Ok(UploadStatusReport::new(upload, logs))
    }

    /// `.` followed by every folder below the user's staging directory, sorted.
    pub async fn list_folders(&self, user_id: i32) -> Result<Vec<String>, UploadApiError> {
        let email = self.owner_email(user_id).await?;
        let user_dir = self.user_dir(&email)?;

        let mut folders = vec![".".to_owned()];
        for entry in WalkDir::new(&user_dir).min_depth(1) {
            let entry = entry.map_err(|e| UploadApiError::Internal(e.into()))?;
            if entry.file_type().is_dir() {
                if let Some(relative) = relative_posix(entry.path(), &user_dir) {
                    folders.push(relative);
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Newest first.
    pub async fn list_uploads(&self, user_id: i32) -> Result<Vec<Upload>, UploadApiError> {
        Ok(self.uploads.uploads_for_user(user_id).await?)
    }

    pub async fn queue_info(&self) -> Result<QueueInfo, UploadApiError> {
        Ok(self.emitter.queue_info().await?)
    }
}
