use crate::database::DbError;
use crate::database::upload::{NewUpload, Upload};
use sqlx::types::Json;
use sqlx::{Executor, Postgres};

const UPLOAD_COLUMNS: &str = r"
    id, user_id, folder_name, project_name, status, created_at, updated_at, retry_count,
    task_handle, remote_project_id, remote_run_id, sample_count, uploaded_samples
";

pub struct UploadStore;

impl UploadStore {
    //================================================================================
    // Core Upload Management
    //================================================================================

    /// Creates a new upload in the `submitted` state.
    pub async fn create(
        executor: impl Executor<'_, Database = Postgres>,
        new_upload: &NewUpload,
    ) -> Result<Upload, DbError> {
        let query = format!(
            r"
            INSERT INTO upload (user_id, folder_name, project_name)
            VALUES ($1, $2, $3)
            RETURNING {UPLOAD_COLUMNS}
            "
        );
        Ok(sqlx::query_as::<_, Upload>(&query)
            .bind(new_upload.user_id)
            .bind(&new_upload.folder_name)
            .bind(new_upload.project_name.as_deref())
            .fetch_one(executor)
            .await?)
    }

    /// Writes every mutable field of the upload back and bumps `updated_at`.
    pub async fn update(
        executor: impl Executor<'_, Database = Postgres>,
        upload: &Upload,
    ) -> Result<Upload, DbError> {
        let query = format!(
            r"
            UPDATE upload
            SET
                project_name = $2,
                status = $3,
                retry_count = $4,
                task_handle = $5,
                remote_project_id = $6,
                remote_run_id = $7,
                sample_count = $8,
                uploaded_samples = $9,
                updated_at = now()
            WHERE id = $1
            RETURNING {UPLOAD_COLUMNS}
            "
        );
        Ok(sqlx::query_as::<_, Upload>(&query)
            .bind(upload.id)
            .bind(upload.project_name.as_deref())
            .bind(upload.status)
            .bind(upload.retry_count)
            .bind(upload.task_handle.as_deref())
            .bind(upload.remote_project_id.as_deref())
            .bind(upload.remote_run_id.as_deref())
            .bind(upload.sample_count)
            .bind(Json(&upload.uploaded_samples))
            .fetch_one(executor)
            .await?)
    }

    //================================================================================
    // Find / Get Methods
    //================================================================================

    pub async fn find_by_id(
        executor: impl Executor<'_, Database = Postgres>,
        upload_id: i64,
    ) -> Result<Option<Upload>, DbError> {
        let query = format!("SELECT {UPLOAD_COLUMNS} FROM upload WHERE id = $1");
        Ok(sqlx::query_as::<_, Upload>(&query)
            .bind(upload_id)
            .fetch_optional(executor)
            .await?)
    }

    /// All uploads of one user, newest first.
    pub async fn list_for_user(
        executor: impl Executor<'_, Database = Postgres>,
        user_id: i32,
    ) -> Result<Vec<Upload>, DbError> {
        let query = format!(
            "SELECT {UPLOAD_COLUMNS} FROM upload WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Upload>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await?)
    }

    /// Uploads that are waiting or running, in submission order.
    pub async fn list_active(
        executor: impl Executor<'_, Database = Postgres>,
    ) -> Result<Vec<Upload>, DbError> {
        let query = format!(
            r"
            SELECT {UPLOAD_COLUMNS}
            FROM upload
            WHERE status IN ('submitted', 'uploading')
            ORDER BY created_at, id
            "
        );
        Ok(sqlx::query_as::<_, Upload>(&query)
            .fetch_all(executor)
            .await?)
    }
}
