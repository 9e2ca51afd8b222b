use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;

/// Lifecycle of a folder-level upload.
///
/// `submitted → uploading → success | failed`, where `failed` goes back to
/// `uploading` while retries remain. `partial` is only set when a crashed run is
/// reconciled from the folder's status artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "upload_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Submitted,
    Uploading,
    Partial,
    Failed,
    Success,
}

impl UploadStatus {
    /// Whether the upload still counts towards the queue.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Submitted | Self::Uploading)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Uploading => "uploading",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample the remote repository has confirmed, in upload order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedSample {
    pub name: String,
    pub project_id: String,
}
