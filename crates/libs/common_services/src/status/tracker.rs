use crate::database::upload::Upload;
use crate::status::{ArtifactState, TransferStatusRecord, read_status_artifact};
use common_types::UploadStatus;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a folder's status artifact says about the next transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Every sample is on the remote side already.
    AlreadyComplete,
    /// Continue a partial run. `remaining` samples are still to go.
    Resume { remaining: usize },
    /// Nothing usable on disk, start from scratch.
    Fresh,
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Copies run id, confirmed samples and (if unset) the project id into the upload.
pub fn apply_record(upload: &mut Upload, record: &TransferStatusRecord) {
    if let Some(run_id) = &record.run_id {
        upload.remote_run_id = Some(run_id.clone());
    }
    upload.uploaded_samples = record.uploaded_samples();
    if upload.remote_project_id.is_none() {
        upload.remote_project_id = record.first_project_id().map(str::to_owned);
    }
    if record.upload_state == ArtifactState::Complete {
        upload.sample_count = count(record.total_samples());
    }
}

/// Reads folder status artifacts and folds them into upload records.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    status_file_name: String,
}

impl StatusTracker {
    #[must_use]
    pub fn new(status_file_name: impl Into<String>) -> Self {
        Self {
            status_file_name: status_file_name.into(),
        }
    }

    #[must_use]
    pub fn artifact_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.status_file_name)
    }

    #[must_use]
    pub fn read(&self, directory: &Path) -> Option<TransferStatusRecord> {
        read_status_artifact(&self.artifact_path(directory))
    }

    /// Decides how the next transfer of `directory` should start, updating `upload` with
    /// what the artifact already knows.
    pub fn reconcile(&self, upload: &mut Upload, directory: &Path, force: bool) -> Reconciliation {
        let Some(record) = self.read(directory) else {
            return Reconciliation::Fresh;
        };

        match record.upload_state {
            ArtifactState::Complete if !force => {
                apply_record(upload, &record);
                info!(
                    "Upload {} was already completed with {} samples",
                    upload.id, upload.sample_count
                );
                Reconciliation::AlreadyComplete
            }
            ArtifactState::Partial => {
                apply_record(upload, &record);
                let remaining = record.remaining();
                upload.sample_count = count(remaining);
                info!(
                    "Upload {} resumes a partial run, {remaining} of {} samples remaining",
                    upload.id,
                    record.total_samples()
                );
                Reconciliation::Resume { remaining }
            }
            ArtifactState::Complete | ArtifactState::Pending => Reconciliation::Fresh,
        }
    }

    /// Re-reads the artifact after a transfer attempt.
    pub fn refresh(&self, upload: &mut Upload, directory: &Path) -> Option<ArtifactState> {
        let record = self.read(directory)?;
        apply_record(upload, &record);
        if record.upload_state == ArtifactState::Partial {
            upload.sample_count = count(record.remaining());
        }
        Some(record.upload_state)
    }

    /// Settles an upload whose run died without reporting back.
    ///
    /// Only meaningful when no worker holds the upload anymore; the caller checks that.
    pub fn settle_orphaned(&self, upload: &mut Upload, directory: &Path) -> UploadStatus {
        let state = self.refresh(upload, directory);
        upload.status = match state {
            Some(ArtifactState::Complete) => UploadStatus::Success,
            Some(ArtifactState::Partial) => UploadStatus::Partial,
            Some(ArtifactState::Pending) | None => UploadStatus::Failed,
        };
        info!(
            "Settled orphaned upload {} as {} from its status artifact",
            upload.id, upload.status
        );
        upload.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::upload_fixture;
    use color_eyre::Result;
    use std::fs;

    const STATUS_FILE: &str = "irida_uploader_status.info";

    fn write_artifact(dir: &Path, state: &str, uploaded: &[bool]) -> Result<()> {
        let samples: Vec<serde_json::Value> = uploaded
            .iter()
            .enumerate()
            .map(|(i, up)| {
                serde_json::json!({
                    "Sample Name": format!("S{}", i + 1),
                    "Project ID": "9",
                    "Uploaded": if *up { "True" } else { "False" },
                })
            })
            .collect();
        let body = serde_json::json!({
            "Run ID": "run-77",
            "Upload Status": state,
            "Sample Status": samples,
        });
        fs::write(dir.join(STATUS_FILE), serde_json::to_vec(&body)?)?;
        Ok(())
    }

    #[test]
    fn complete_artifact_short_circuits() -> Result<()> {
        // ARRANGE
        let dir = tempfile::tempdir()?;
        write_artifact(dir.path(), "Complete", &[true, true, true])?;
        let tracker = StatusTracker::new(STATUS_FILE);
        let mut upload = upload_fixture(1, 1, "run");

        // ACT
        let outcome = tracker.reconcile(&mut upload, dir.path(), false);

        // ASSERT
        assert_eq!(outcome, Reconciliation::AlreadyComplete);
        assert_eq!(upload.sample_count, 3);
        assert_eq!(upload.remote_run_id.as_deref(), Some("run-77"));
        assert_eq!(upload.remote_project_id.as_deref(), Some("9"));
        assert_eq!(upload.uploaded_samples.len(), 3);
        Ok(())
    }

    #[test]
    fn force_ignores_complete_artifact() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_artifact(dir.path(), "complete", &[true])?;
        let tracker = StatusTracker::new(STATUS_FILE);
        let mut upload = upload_fixture(1, 1, "run");

        assert_eq!(
            tracker.reconcile(&mut upload, dir.path(), true),
            Reconciliation::Fresh
        );
        Ok(())
    }

    #[test]
    fn partial_artifact_counts_remaining() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_artifact(dir.path(), "partial", &[true, false, true, false, false])?;
        let tracker = StatusTracker::new(STATUS_FILE);
        let mut upload = upload_fixture(1, 1, "run");

        let outcome = tracker.reconcile(&mut upload, dir.path(), false);

        assert_eq!(outcome, Reconciliation::Resume { remaining: 3 });
        assert_eq!(upload.sample_count, 3);
        assert_eq!(upload.uploaded_samples.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_artifact_is_fresh() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let tracker = StatusTracker::new(STATUS_FILE);
        let mut upload = upload_fixture(1, 1, "run");

        assert_eq!(
            tracker.reconcile(&mut upload, dir.path(), false),
            Reconciliation::Fresh
        );
        assert!(tracker.refresh(&mut upload, dir.path()).is_none());
        Ok(())
    }

    #[test]
    fn orphaned_uploads_follow_the_artifact() -> Result<()> {
        let tracker = StatusTracker::new(STATUS_FILE);

        let complete = tempfile::tempdir()?;
        write_artifact(complete.path(), "complete", &[true, true])?;
        let mut upload = upload_fixture(1, 1, "a");
        upload.status = UploadStatus::Uploading;
        assert_eq!(
            tracker.settle_orphaned(&mut upload, complete.path()),
            UploadStatus::Success
        );
        assert_eq!(upload.sample_count, 2);

        let partial = tempfile::tempdir()?;
        write_artifact(partial.path(), "partial", &[true, false])?;
        let mut upload = upload_fixture(2, 1, "b");
        assert_eq!(
            tracker.settle_orphaned(&mut upload, partial.path()),
            UploadStatus::Partial
        );

        let empty = tempfile::tempdir()?;
        let mut upload = upload_fixture(3, 1, "c");
        assert_eq!(
            tracker.settle_orphaned(&mut upload, empty.path()),
            UploadStatus::Failed
        );
        Ok(())
    }
}
