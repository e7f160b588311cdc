//! User lookups (users are owned by the session layer)

use sqlx::SqlitePool;
use wlms_common::Result;

pub async fn display_name(pool: &SqlitePool, user_id: &str) -> Result<Option<String>> {
    let name: Option<String> = sqlx::query_scalar("SELECT display_name FROM users WHERE guid = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(name)
}
