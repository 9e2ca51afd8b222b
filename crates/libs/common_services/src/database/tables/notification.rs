use chrono::{DateTime, Utc};
use common_types::NotificationKind;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i32,
    pub upload_id: Option<i64>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: i32,
    pub upload_id: Option<i64>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}
