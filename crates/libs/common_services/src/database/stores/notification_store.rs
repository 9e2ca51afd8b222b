use crate::database::DbError;
use crate::database::notification::{NewNotification, Notification};
use sqlx::{Executor, Postgres};

pub struct NotificationStore;

impl NotificationStore {
    pub async fn create(
        executor: impl Executor<'_, Database = Postgres>,
        notification: &NewNotification,
    ) -> Result<Notification, DbError> {
        Ok(sqlx::query_as::<_, Notification>(
            r"
            INSERT INTO notification (user_id, upload_id, title, message, kind)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, upload_id, title, message, kind, read, created_at
            ",
        )
        .bind(notification.user_id)
        .bind(notification.upload_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind)
        .fetch_one(executor)
        .await?)
    }

    /// Inserts or replaces the queue notice of an upload.
    pub async fn upsert_queue_notice(
        executor: impl Executor<'_, Database = Postgres>,
        notification: &NewNotification,
    ) -> Result<Notification, DbError> {
        Ok(sqlx::query_as::<_, Notification>(
            r"
            INSERT INTO notification (user_id, upload_id, title, message, kind)
            VALUES ($1, $2, $3, $4, 'info')
            -- THIS PART MUST MATCH THE INDEX DEFINITION EXACTLY
            ON CONFLICT (user_id, upload_id) WHERE kind = 'info'
            DO UPDATE SET title = EXCLUDED.title, message = EXCLUDED.message
            RETURNING id, user_id, upload_id, title, message, kind, read, created_at
            ",
        )
        .bind(notification.user_id)
        .bind(notification.upload_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .fetch_one(executor)
        .await?)
    }

    /// Newest unread notifications of a user.
    pub async fn unread_for_user(
        executor: impl Executor<'_, Database = Postgres>,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        Ok(sqlx::query_as::<_, Notification>(
            r"
            SELECT id, user_id, upload_id, title, message, kind, read, created_at
            FROM notification
            WHERE user_id = $1 AND NOT read
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(executor)
        .await?)
    }

    /// Returns `false` when the notification doesn't exist or belongs to someone else.
    pub async fn mark_read(
        executor: impl Executor<'_, Database = Postgres>,
        user_id: i32,
        notification_id: i64,
    ) -> Result<bool, DbError> {
        let result =
            sqlx::query("UPDATE notification SET read = true WHERE id = $1 AND user_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
