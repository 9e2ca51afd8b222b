use crate::database::notification::NewNotification;
use crate::database::upload::Upload;
use crate::database::{DbError, NotificationRepository, UploadRepository};
use crate::job_queue::JobQueue;
use crate::notifications::{QueueInfo, messages};
use common_types::{EmailPayload, NotificationKind, UploadStatus};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Turns upload state changes into in-app notifications and email jobs.
///
/// Everything here is best-effort: failures are logged and swallowed, a broken
/// notification never fails an upload.
#[derive(Clone)]
pub struct NotificationEmitter {
    uploads: Arc<dyn UploadRepository>,
    notifications: Arc<dyn NotificationRepository>,
    jobs: Arc<dyn JobQueue>,
    max_concurrent_uploads: usize,
}

impl NotificationEmitter {
    #[must_use]
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        notifications: Arc<dyn NotificationRepository>,
        jobs: Arc<dyn JobQueue>,
        max_concurrent_uploads: usize,
    ) -> Self {
        Self {
            uploads,
            notifications,
            jobs,
            max_concurrent_uploads,
        }
    }

    pub async fn queue_info(&self) -> Result<QueueInfo, DbError> {
        let active = self.uploads.active_uploads().await?;
        Ok(QueueInfo::from_active(&active, self.max_concurrent_uploads))
    }

    /// Records a notification of `kind` about `upload` with the standard text.
    pub async fn notify(&self, upload: &Upload, kind: NotificationKind) {
        let result = match kind {
            NotificationKind::Success => {
                self.create(
                    upload,
                    messages::TITLE_COMPLETE,
                    messages::completed(&upload.folder_name, upload.sample_count),
                    kind,
                )
                .await
            }
            NotificationKind::Error => {
                self.create(
                    upload,
                    messages::TITLE_FAILED,
                    messages::failed(&upload.folder_name),
                    kind,
                )
                .await
            }
            NotificationKind::Info => self.upsert_queue_notice(upload).await,
        };
        if let Err(e) = result {
            error!("Failed to create {kind} notification for upload {}: {e}", upload.id);
        }
    }

    pub async fn upload_succeeded(&self, upload: &Upload) {
        self.notify(upload, NotificationKind::Success).await;
        self.email(
            upload,
            messages::TITLE_COMPLETE,
            messages::email_completed(&upload.folder_name),
        )
        .await;
    }

    /// The folder's artifact said complete before anything was transferred.
    pub async fn already_completed(&self, upload: &Upload) {
        if let Err(e) = self
            .create(
                upload,
                messages::TITLE_COMPLETE,
                messages::already_completed(&upload.folder_name, upload.sample_count),
                NotificationKind::Success,
            )
            .await
        {
            error!("Failed to create success notification for upload {}: {e}", upload.id);
        }
        self.email(
            upload,
            messages::TITLE_COMPLETE,
            messages::email_completed(&upload.folder_name),
        )
        .await;
    }

    /// Terminal failure that will not be retried.
    pub async fn upload_failed(&self, upload: &Upload) {
        self.notify(upload, NotificationKind::Error).await;
        self.email(
            upload,
            messages::TITLE_FAILED,
            messages::email_failed(&upload.folder_name),
        )
        .await;
    }

    pub async fn retries_exhausted(&self, upload: &Upload) {
        if let Err(e) = self
            .create(
                upload,
                messages::TITLE_FAILED,
                messages::retries_exhausted(&upload.folder_name, upload.retry_count),
                NotificationKind::Error,
            )
            .await
        {
            error!("Failed to create error notification for upload {}: {e}", upload.id);
        }
        self.email(
            upload,
            messages::TITLE_FAILED,
            messages::email_failed(&upload.folder_name),
        )
        .await;
    }

    /// An error line printed by the transfer while it runs.
    pub async fn transfer_error(&self, user_id: i32, upload_id: i64, line: &str) {
        let notification = NewNotification {
            user_id,
            upload_id: Some(upload_id),
            title: messages::TITLE_ERROR.to_owned(),
            message: line.to_owned(),
            kind: NotificationKind::Error,
        };
        if let Err(e) = self.notifications.create_notification(notification).await {
            error!("Failed to record transfer error for upload {upload_id}: {e}");
        }
    }

    /// Updates the queue notice of every upload that hasn't started yet.
    pub async fn refresh_queue_notifications(&self) -> Result<usize, DbError> {
        let active = self.uploads.active_uploads().await?;
        let info = QueueInfo::from_active(&active, self.max_concurrent_uploads);

        let mut refreshed = 0;
        for upload in active.iter().filter(|u| u.status == UploadStatus::Submitted) {
            match self.upsert_with(upload, &info).await {
                Ok(()) => refreshed += 1,
                Err(e) => error!("Failed to refresh queue notice for upload {}: {e}", upload.id),
            }
        }
        debug!(
            "Refreshed {refreshed} queue notices, {} uploads in queue",
            info.total_in_queue
        );
        Ok(refreshed)
    }

    async fn upsert_queue_notice(&self, upload: &Upload) -> Result<(), DbError> {
        let info = self.queue_info().await?;
        self.upsert_with(upload, &info).await
    }

    async fn upsert_with(&self, upload: &Upload, info: &QueueInfo) -> Result<(), DbError> {
        let notification = NewNotification {
            user_id: upload.user_id,
            upload_id: Some(upload.id),
            title: messages::TITLE_IN_QUEUE.to_owned(),
            message: messages::in_queue(
                &upload.folder_name,
                info.position_of(upload.id),
                info.total_in_queue,
            ),
            kind: NotificationKind::Info,
        };
        self.notifications
            .upsert_queue_notification(notification)
            .await?;
        Ok(())
    }

    async fn create(
        &self,
        upload: &Upload,
        title: &str,
        message: String,
        kind: NotificationKind,
    ) -> Result<(), DbError> {
        self.notifications
            .create_notification(NewNotification {
                user_id: upload.user_id,
                upload_id: Some(upload.id),
                title: title.to_owned(),
                message,
                kind,
            })
            .await?;
        Ok(())
    }

    async fn email(&self, upload: &Upload, subject: &str, message: String) {
        let user = match self.uploads.find_user(upload.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                error!("Owner {} of upload {} not found, no email sent", upload.user_id, upload.id);
                return;
            }
            Err(e) => {
                error!("Failed to look up owner of upload {}: {e}", upload.id);
                return;
            }
        };
        let payload = EmailPayload {
            recipient: user.email,
            subject: subject.to_owned(),
            message,
        };
        match self.jobs.enqueue_email(&payload).await {
            Ok(_) => info!("Queued '{subject}' email for upload {}", upload.id),
            Err(e) => error!("Failed to queue email for upload {}: {e}", upload.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use chrono::{Duration, Utc};
    use color_eyre::Result;

    fn emitter(store: &Arc<MemoryStore>) -> NotificationEmitter {
        NotificationEmitter::new(store.clone(), store.clone(), store.clone(), 2)
    }

    #[tokio::test]
    async fn queue_notices_are_upserted_not_duplicated() -> Result<()> {
        // ARRANGE
        let store = Arc::new(MemoryStore::default());
        let user = store.add_user("ada@example.org").await;
        let start = Utc::now();
        let mut ids = Vec::new();
        for i in 0..4 {
            let mut upload = store.insert_upload(user.id, &format!("run_{i}")).await;
            upload.created_at = start + Duration::seconds(i);
            if i < 3 {
                upload.status = UploadStatus::Uploading;
            }
            store.put_upload(upload.clone()).await;
            ids.push(upload.id);
        }
        let emitter = emitter(&store);

        // ACT
        emitter.refresh_queue_notifications().await?;
        emitter.refresh_queue_notifications().await?;

        // ASSERT
        let notices = store.notifications().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].upload_id, Some(ids[3]));
        assert_eq!(notices[0].kind, NotificationKind::Info);
        assert_eq!(
            notices[0].message,
            "Upload of run_3 is in queue (Position 4 of 4). 4 total uploads in queue."
        );
        Ok(())
    }

    #[tokio::test]
    async fn success_creates_notification_and_email() -> Result<()> {
        let store = Arc::new(MemoryStore::default());
        let user = store.add_user("ada@example.org").await;
        let mut upload = store.insert_upload(user.id, "run_9").await;
        upload.sample_count = 12;

        emitter(&store).upload_succeeded(&upload).await;

        let notices = store.notifications().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Upload Complete");
        assert!(notices[0].message.contains("12 samples"));
        let emails = store.emails().await;
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].recipient, "ada@example.org");
        assert_eq!(emails[0].message, "Your upload of run_9 has completed successfully.");
        Ok(())
    }

    #[tokio::test]
    async fn missing_owner_does_not_fail() -> Result<()> {
        let store = Arc::new(MemoryStore::default());
        let upload = store.insert_upload(404, "orphan").await;

        emitter(&store).upload_failed(&upload).await;

        assert_eq!(store.notifications().await.len(), 1);
        assert!(store.emails().await.is_empty());
        Ok(())
    }
}
