use crate::database::upload::Upload;
use common_types::{UploadStatus, UploadedSample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitUploadRequest {
    pub user_id: i32,
    pub folder_name: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub force: bool,
    /// Validate only, don't create anything.
    #[serde(default)]
    pub check_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitUploadResponse {
    /// The folder was uploaded completely before. Submit again with `force` to re-upload.
    Warning {
        message: String,
        sample_count: usize,
        project_id: Option<String>,
        needs_force: bool,
    },
    /// `check_only` passed.
    Ok,
    Submitted { upload_id: i64, task_handle: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadStatusReport {
    pub upload_id: i64,
    pub folder_name: String,
    pub status: UploadStatus,
    pub project_id: Option<String>,
    pub sample_count: i32,
    pub run_id: Option<String>,
    pub retry_count: i32,
    pub uploaded_samples: Vec<UploadedSample>,
    /// Tail of the transfer log. Empty when there is no log yet.
    pub logs: Vec<String>,
}

impl UploadStatusReport {
    #[must_use]
    pub fn new(upload: Upload, logs: Vec<String>) -> Self {
        Self {
            upload_id: upload.id,
            folder_name: upload.folder_name,
            status: upload.status,
            project_id: upload.remote_project_id,
            sample_count: upload.sample_count,
            run_id: upload.remote_run_id,
            retry_count: upload.retry_count,
            uploaded_samples: upload.uploaded_samples,
            logs,
        }
    }
}
