#![allow(dead_code)]

use quizhub::db::queries::quizzes::{
    create_quiz_with_questions, NewAnswer, NewQuestion, QuizMeta,
};
use quizhub::db::queries::users;
use quizhub::text::slugify;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn test_pool() -> SqlitePool {
    // One connection so the in-memory database is shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub async fn create_user(pool: &SqlitePool, username: &str) -> i64 {
    users::create_user(
        pool,
        username,
        &format!("{username}@example.com"),
        "unusable-hash",
    )
    .await
    .unwrap()
}

pub fn quiz_meta(title: &str) -> QuizMeta {
    QuizMeta {
        title: title.to_owned(),
        slug: slugify(title),
        description: "A quiz".to_owned(),
        thumbnail: None,
        category_id: None,
    }
}

/// Four answers, the one at `correct` flagged.
pub fn new_question(text: &str, correct: usize) -> NewQuestion {
    NewQuestion {
        question: text.to_owned(),
        answers: (0..4)
            .map(|i| NewAnswer {
                answer: format!("answer {i}"),
                is_correct: i == correct,
            })
            .collect(),
    }
}

pub async fn create_simple_quiz(pool: &SqlitePool, author_id: i64, title: &str) -> i64 {
    create_quiz_with_questions(
        pool,
        author_id,
        &quiz_meta(title),
        &[new_question("What is the answer?", 3)],
    )
    .await
    .unwrap()
}
