use sqlx::SqlitePool;

use super::users::User;

pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: Option<i64>,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES (?1, ?2)")
        .bind(token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn session_exists(pool: &SqlitePool, token: &str) -> sqlx::Result<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE token = ?1")
        .bind(token)
        .fetch_one(pool)
        .await?;
    Ok(count.0 > 0)
}

/// Resolves the session's user; None for unknown tokens and for
/// anonymous sessions alike.
pub async fn get_session_user(pool: &SqlitePool, token: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "SELECT users.* FROM sessions \
         JOIN users ON users.id = sessions.user_id \
         WHERE sessions.token = ?1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}
