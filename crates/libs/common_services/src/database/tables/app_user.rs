use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// The owner of uploads. The email doubles as the name of the user's staging folder.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
