use serde_json::Value;
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, FromRow)]
#[allow(clippy::struct_field_names)]
pub struct Job {
    pub id: i64,
    pub payload: Option<Value>,
    pub upload_id: Option<i64>,
    pub job_type: JobType,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
pub enum JobType {
    ProcessUpload,
    SendEmail,
}

impl JobType {
    /// Lower runs first. Emails are cheap and should not wait behind day-long transfers.
    #[must_use]
    pub const fn get_priority(&self) -> i32 {
        match self {
            Self::SendEmail => 10,
            Self::ProcessUpload => 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Failed,
    Done,
    Cancelled,
}
