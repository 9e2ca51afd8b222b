use crate::database::DbError;
use crate::database::app_user::User;
use sqlx::{Executor, Postgres};

pub struct UserStore;

impl UserStore {
    /// Registers a user. Their email names their staging directory.
    pub async fn create(
        executor: impl Executor<'_, Database = Postgres>,
        email: &str,
        name: &str,
    ) -> Result<User, DbError> {
        Ok(sqlx::query_as::<_, User>(
            r"
            INSERT INTO app_user (email, name)
            VALUES ($1, $2)
            RETURNING id, email, name, created_at, updated_at
            ",
        )
        .bind(email)
        .bind(name)
        .fetch_one(executor)
        .await?)
    }

    pub async fn find_by_id(
        executor: impl Executor<'_, Database = Postgres>,
        user_id: i32,
    ) -> Result<Option<User>, DbError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, email, name, created_at, updated_at FROM app_user WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?)
    }
}
