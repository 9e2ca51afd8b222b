use crate::database::app_user::User;
use crate::database::notification::{NewNotification, Notification};
use crate::database::upload::{NewUpload, Upload};
use crate::database::{DbError, JobStore, NotificationStore, UploadStore, UserStore};
use async_trait::async_trait;
use sqlx::PgPool;

/// Upload records and their owners, as the orchestrator and the entry points see them.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    async fn find_user(&self, user_id: i32) -> Result<Option<User>, DbError>;

    async fn create_upload(&self, new_upload: NewUpload) -> Result<Upload, DbError>;

    async fn find_upload(&self, upload_id: i64) -> Result<Option<Upload>, DbError>;

    /// Persists every mutable field and returns the stored row.
    async fn save_upload(&self, upload: &Upload) -> Result<Upload, DbError>;

    async fn uploads_for_user(&self, user_id: i32) -> Result<Vec<Upload>, DbError>;

    /// `submitted` and `uploading` uploads, oldest first.
    async fn active_uploads(&self) -> Result<Vec<Upload>, DbError>;

    /// Whether some worker is (or will be) executing the upload right now.
    async fn has_live_job(&self, upload_id: i64) -> Result<bool, DbError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DbError>;

    /// Replaces the existing queue notice for `(user, upload)` if there is one.
    async fn upsert_queue_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DbError>;

    async fn unread_notifications(
        &self,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError>;

    async fn mark_notification_read(
        &self,
        user_id: i32,
        notification_id: i64,
    ) -> Result<bool, DbError>;
}

/// Postgres implementation of the repositories.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
    heartbeat_timeout_seconds: f64,
}

impl PgRepository {
    #[must_use]
    pub const fn new(pool: PgPool, heartbeat_timeout_seconds: f64) -> Self {
        Self {
            pool,
            heartbeat_timeout_seconds,
        }
    }
}

#[async_trait]
impl UploadRepository for PgRepository {
    async fn find_user(&self, user_id: i32) -> Result<Option<User>, DbError> {
        UserStore::find_by_id(&self.pool, user_id).await
    }

    async fn create_upload(&self, new_upload: NewUpload) -> Result<Upload, DbError> {
        UploadStore::create(&self.pool, &new_upload).await
    }

    async fn find_upload(&self, upload_id: i64) -> Result<Option<Upload>, DbError> {
        UploadStore::find_by_id(&self.pool, upload_id).await
    }

    async fn save_upload(&self, upload: &Upload) -> Result<Upload, DbError> {
        UploadStore::update(&self.pool, upload).await
    }

    async fn uploads_for_user(&self, user_id: i32) -> Result<Vec<Upload>, DbError> {
        UploadStore::list_for_user(&self.pool, user_id).await
    }

    async fn active_uploads(&self) -> Result<Vec<Upload>, DbError> {
        UploadStore::list_active(&self.pool).await
    }

    async fn has_live_job(&self, upload_id: i64) -> Result<bool, DbError> {
        JobStore::has_live_upload_job(&self.pool, upload_id, self.heartbeat_timeout_seconds).await
    }
}

#[async_trait]
impl NotificationRepository for PgRepository {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DbError> {
        NotificationStore::create(&self.pool, &notification).await
    }

    async fn upsert_queue_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DbError> {
        NotificationStore::upsert_queue_notice(&self.pool, &notification).await
    }

    async fn unread_notifications(
        &self,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        NotificationStore::unread_for_user(&self.pool, user_id, limit).await
    }

    async fn mark_notification_read(
        &self,
        user_id: i32,
        notification_id: i64,
    ) -> Result<bool, DbError> {
        NotificationStore::mark_read(&self.pool, user_id, notification_id).await
    }
}
