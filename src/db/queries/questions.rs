use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub answer: String,
    pub is_correct: bool,
}

pub async fn get_questions(pool: &SqlitePool, quiz_id: i64) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE quiz_id = ?1 ORDER BY id")
        .bind(quiz_id)
        .fetch_all(pool)
        .await
}

pub async fn count_questions(pool: &SqlitePool, quiz_id: i64) -> sqlx::Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions WHERE quiz_id = ?1")
        .bind(quiz_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Fetches a quiz's questions each paired with its four answers, both in
/// insertion order.
pub async fn get_questions_with_answers(
    pool: &SqlitePool,
    quiz_id: i64,
) -> sqlx::Result<Vec<(Question, Vec<Answer>)>> {
    let questions = get_questions(pool, quiz_id).await?;
    let answers = sqlx::query_as::<_, Answer>(
        "SELECT answers.* FROM answers \
         JOIN questions ON answers.question_id = questions.id \
         WHERE questions.quiz_id = ?1 \
         ORDER BY answers.question_id, answers.id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let chunks = answers.into_iter().chunk_by(|a| a.question_id);
    let mut grouped: Vec<(i64, Vec<Answer>)> = Vec::new();
    for (question_id, group) in &chunks {
        grouped.push((question_id, group.collect()));
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let answers = grouped
                .iter_mut()
                .find(|(id, _)| *id == question.id)
                .map(|(_, answers)| std::mem::take(answers))
                .unwrap_or_default();
            (question, answers)
        })
        .collect())
}

/// Deletes one question. A quiz must keep at least one question, so
/// removing the last one removes the quiz itself.
pub async fn delete_question(pool: &SqlitePool, question_id: i64) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    let quiz_id: (i64,) = sqlx::query_as("SELECT quiz_id FROM questions WHERE id = ?1")
        .bind(question_id)
        .fetch_one(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM questions WHERE id = ?1")
        .bind(question_id)
        .execute(&mut *tx)
        .await?;
    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions WHERE quiz_id = ?1")
        .bind(quiz_id.0)
        .fetch_one(&mut *tx)
        .await?;
    if remaining.0 == 0 {
        sqlx::query("DELETE FROM quizzes WHERE id = ?1")
            .bind(quiz_id.0)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}
