use crate::database::notification::Notification;
use crate::database::{DbError, NotificationRepository};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationApiError {
    #[error("Notification {0} not found.")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    unread_limit: i64,
}

impl NotificationService {
    #[must_use]
    pub fn new(notifications: Arc<dyn NotificationRepository>, unread_limit: i64) -> Self {
        Self {
            notifications,
            unread_limit,
        }
    }

    /// The newest unread notifications, newest first.
    pub async fn unread(&self, user_id: i32) -> Result<Vec<Notification>, NotificationApiError> {
        Ok(self
            .notifications
            .unread_notifications(user_id, self.unread_limit)
            .await?)
    }

    pub async fn mark_read(
        &self,
        user_id: i32,
        notification_id: i64,
    ) -> Result<(), NotificationApiError> {
        if self
            .notifications
            .mark_notification_read(user_id, notification_id)
            .await?
        {
            Ok(())
        } else {
            Err(NotificationApiError::NotFound(notification_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::notification::NewNotification;
    use crate::testing::MemoryStore;
    use color_eyre::Result;
    use common_types::NotificationKind;

    #[tokio::test]
    async fn unread_is_capped_and_mark_read_checks_owner() -> Result<()> {
        // ARRANGE
        let store = Arc::new(MemoryStore::default());
        let mut ids = Vec::new();
        for i in 0..7 {
            let n = store
                .create_notification(NewNotification {
                    user_id: 1,
                    upload_id: None,
                    title: "Upload Error".to_owned(),
                    message: format!("line {i}"),
                    kind: NotificationKind::Error,
                })
                .await?;
            ids.push(n.id);
        }
        let service = NotificationService::new(store.clone(), 5);

        // ACT
        service.mark_read(1, ids[6]).await?;
        let foreign = service.mark_read(2, ids[5]).await;
        let unread = service.unread(1).await?;

        // ASSERT
        assert!(matches!(foreign, Err(NotificationApiError::NotFound(_))));
        assert_eq!(unread.len(), 5);
        assert!(unread.iter().all(|n| n.id != ids[6]));
        Ok(())
    }
}
