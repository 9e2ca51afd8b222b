use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessUploadPayload {
    pub upload_id: i64,
    /// Re-upload even when the folder's status artifact says the run is complete.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    pub recipient: String,
    pub subject: String,
    pub message: String,
}
