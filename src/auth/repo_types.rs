use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                      // assigned by the store
    pub username: String,
    pub email: String,                // unique
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 PHC string, never exposed in JSON
    pub created_at: OffsetDateTime,
}
