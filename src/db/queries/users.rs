use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub photo: Option<String>,
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn username_taken(pool: &SqlitePool, username: &str) -> sqlx::Result<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?1")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(count.0 > 0)
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> sqlx::Result<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?1")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count.0 > 0)
}

/// Creates the user together with its empty profile.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> sqlx::Result<i64> {
    let mut tx = pool.begin().await?;
    let user_id = sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)")
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
    sqlx::query("INSERT INTO profiles (user_id) VALUES (?1)")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(user_id)
}

pub async fn update_password(pool: &SqlitePool, user_id: i64, password_hash: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_profile(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Profile> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn update_profile(
    pool: &SqlitePool,
    user_id: i64,
    description: &str,
    photo: Option<&str>,
) -> sqlx::Result<()> {
    // A missing photo keeps the stored one, it does not clear it.
    sqlx::query(
        "UPDATE profiles SET description = ?1, photo = COALESCE(?2, photo) WHERE user_id = ?3",
    )
    .bind(description)
    .bind(photo)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}
