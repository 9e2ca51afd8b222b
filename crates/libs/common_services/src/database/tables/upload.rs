use chrono::{DateTime, Utc};
use common_types::{UploadStatus, UploadedSample};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Upload {
    pub id: i64,
    pub user_id: i32,
    pub folder_name: String,
    pub project_name: Option<String>,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub retry_count: i32,
    /// Id of the queue job currently responsible for this upload.
    pub task_handle: Option<String>,
    pub remote_project_id: Option<String>,
    pub remote_run_id: Option<String>,
    pub sample_count: i32,
    #[sqlx(json)]
    pub uploaded_samples: Vec<UploadedSample>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
    pub user_id: i32,
    pub folder_name: String,
    pub project_name: Option<String>,
}
