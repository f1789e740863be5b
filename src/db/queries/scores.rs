use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Score {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub percentage: i64,
    pub created_at: DateTime<Utc>,
}

pub async fn create_score(
    pool: &SqlitePool,
    user_id: i64,
    quiz_id: i64,
    percentage: i64,
) -> sqlx::Result<i64> {
    let id = sqlx::query("INSERT INTO scores (user_id, quiz_id, percentage) VALUES (?1, ?2, ?3)")
        .bind(user_id)
        .bind(quiz_id)
        .bind(percentage)
        .execute(pool)
        .await?
        .last_insert_rowid();
    Ok(id)
}

/// Mean of the quiz's recorded percentages, 0 when no attempt exists.
pub async fn average_score(pool: &SqlitePool, quiz_id: i64) -> sqlx::Result<f64> {
    let avg: (f64,) = sqlx::query_as(
        "SELECT CAST(COALESCE(AVG(percentage), 0) AS REAL) FROM scores WHERE quiz_id = ?1",
    )
    .bind(quiz_id)
    .fetch_one(pool)
    .await?;
    Ok(avg.0)
}
