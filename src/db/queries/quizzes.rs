use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

pub const PAGE_SIZE: i64 = 9;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the listing/detail projection: the quiz plus its author
/// name, question count and average score.
#[derive(Debug, Clone, FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub author: String,
    pub category: Option<String>,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub question_count: i64,
    pub avg_score: f64,
}

pub struct QuizMeta {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub category_id: Option<i64>,
}

pub struct NewAnswer {
    pub answer: String,
    pub is_correct: bool,
}

pub struct NewQuestion {
    pub question: String,
    pub answers: Vec<NewAnswer>,
}

/// How one submitted question block maps onto the stored quiz.
pub enum QuestionOp {
    Insert(NewQuestion),
    Update {
        id: i64,
        question: String,
        answers: Vec<(i64, NewAnswer)>,
    },
    Delete(i64),
}

#[derive(Default)]
pub struct QuizFilter {
    pub author: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub page: i64,
}

pub struct QuizPage {
    pub quizzes: Vec<QuizSummary>,
    pub page: i64,
    pub total_pages: i64,
}

const SUMMARY_SELECT: &str = "SELECT q.id, q.title, q.slug, q.description, q.thumbnail, \
     u.username AS author, c.title AS category, q.likes, q.created_at, \
     (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS question_count, \
     CAST(COALESCE((SELECT AVG(percentage) FROM scores WHERE quiz_id = q.id), 0) AS REAL) AS avg_score \
     FROM quizzes q \
     JOIN users u ON u.id = q.author_id \
     LEFT JOIN categories c ON c.id = q.category_id";

// Whitelist of sort keys; anything else is silently ignored.
fn order_clause(sort_by: &str) -> Option<&'static str> {
    Some(match sort_by {
        "created" => "q.created_at ASC, q.id ASC",
        "-created" => "q.created_at DESC, q.id DESC",
        "avg_score" => "avg_score ASC",
        "-avg_score" => "avg_score DESC",
        "length" => "question_count ASC",
        "-length" => "question_count DESC",
        "likes" => "q.likes ASC",
        "-likes" => "q.likes DESC",
        _ => return None,
    })
}

pub async fn get_quiz(pool: &SqlitePool, id: i64) -> sqlx::Result<Quiz> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_quiz_by_slug(pool: &SqlitePool, slug: &str) -> sqlx::Result<Quiz> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE slug = ?1")
        .bind(slug)
        .fetch_one(pool)
        .await
}

pub async fn get_summary_by_slug(pool: &SqlitePool, slug: &str) -> sqlx::Result<QuizSummary> {
    sqlx::query_as::<_, QuizSummary>(&format!("{SUMMARY_SELECT} WHERE q.slug = ?1"))
        .bind(slug)
        .fetch_one(pool)
        .await
}

pub async fn get_quizzes_for_author(pool: &SqlitePool, author_id: i64) -> sqlx::Result<Vec<Quiz>> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE author_id = ?1 ORDER BY created_at DESC")
        .bind(author_id)
        .fetch_all(pool)
        .await
}

pub async fn quiz_title_taken(
    pool: &SqlitePool,
    title: &str,
    exclude_quiz: Option<i64>,
) -> sqlx::Result<bool> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM quizzes WHERE title = ?1 AND id != ?2")
            .bind(title)
            .bind(exclude_quiz.unwrap_or(-1))
            .fetch_one(pool)
            .await?;
    Ok(count.0 > 0)
}

/// Paginated, filtered, optionally sorted quiz listing.
pub async fn list_quizzes(pool: &SqlitePool, filter: &QuizFilter) -> sqlx::Result<QuizPage> {
    // An empty filter value matches everything; for categories the
    // sentinel "any" means the same.
    let author = filter.author.as_deref().unwrap_or("");
    let category = filter
        .category
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "any")
        .unwrap_or("");
    let where_clause =
        " WHERE (?1 = '' OR u.username = ?1) AND (?2 = '' OR c.slug = ?2)";

    let total: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM quizzes q \
         JOIN users u ON u.id = q.author_id \
         LEFT JOIN categories c ON c.id = q.category_id{where_clause}"
    ))
    .bind(author)
    .bind(category)
    .fetch_one(pool)
    .await?;
    let total_pages = (total.0 + PAGE_SIZE - 1) / PAGE_SIZE;

    let mut sql = format!("{SUMMARY_SELECT}{where_clause}");
    if let Some(order) = filter.sort_by.as_deref().and_then(order_clause) {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    sql.push_str(" LIMIT ?3 OFFSET ?4");

    let page = filter.page.max(1);
    let quizzes = sqlx::query_as::<_, QuizSummary>(&sql)
        .bind(author)
        .bind(category)
        .bind(PAGE_SIZE)
        .bind((page - 1) * PAGE_SIZE)
        .fetch_all(pool)
        .await?;

    Ok(QuizPage {
        quizzes,
        page,
        total_pages,
    })
}

async fn insert_question(
    tx: &mut Transaction<'_, Sqlite>,
    quiz_id: i64,
    question: &NewQuestion,
) -> sqlx::Result<i64> {
    let question_id = sqlx::query("INSERT INTO questions (quiz_id, question) VALUES (?1, ?2)")
        .bind(quiz_id)
        .bind(&question.question)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
    for answer in &question.answers {
        sqlx::query("INSERT INTO answers (question_id, answer, is_correct) VALUES (?1, ?2, ?3)")
            .bind(question_id)
            .bind(&answer.answer)
            .bind(answer.is_correct)
            .execute(&mut **tx)
            .await?;
    }
    Ok(question_id)
}

/// Persists the quiz together with its questions and answers. Callers
/// validate first; nothing is written on failure part way through since
/// the whole tree goes in one transaction.
pub async fn create_quiz_with_questions(
    pool: &SqlitePool,
    author_id: i64,
    meta: &QuizMeta,
    questions: &[NewQuestion],
) -> sqlx::Result<i64> {
    let mut tx = pool.begin().await?;
    let quiz_id = sqlx::query(
        "INSERT INTO quizzes (title, slug, description, thumbnail, author_id, category_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&meta.title)
    .bind(&meta.slug)
    .bind(&meta.description)
    .bind(meta.thumbnail.as_deref())
    .bind(author_id)
    .bind(meta.category_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();
    for question in questions {
        insert_question(&mut tx, quiz_id, question).await?;
    }
    tx.commit().await?;
    Ok(quiz_id)
}

/// Applies an update of the quiz metadata plus per-question operations
/// (insert/update/delete) in one transaction.
pub async fn update_quiz_with_questions(
    pool: &SqlitePool,
    quiz_id: i64,
    meta: &QuizMeta,
    ops: &[QuestionOp],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE quizzes SET title = ?1, slug = ?2, description = ?3, \
         thumbnail = COALESCE(?4, thumbnail), category_id = ?5, \
         updated_at = datetime('now') WHERE id = ?6",
    )
    .bind(&meta.title)
    .bind(&meta.slug)
    .bind(&meta.description)
    .bind(meta.thumbnail.as_deref())
    .bind(meta.category_id)
    .bind(quiz_id)
    .execute(&mut *tx)
    .await?;

    for op in ops {
        match op {
            QuestionOp::Insert(question) => {
                insert_question(&mut tx, quiz_id, question).await?;
            }
            QuestionOp::Update {
                id,
                question,
                answers,
            } => {
                sqlx::query("UPDATE questions SET question = ?1 WHERE id = ?2 AND quiz_id = ?3")
                    .bind(question)
                    .bind(id)
                    .bind(quiz_id)
                    .execute(&mut *tx)
                    .await?;
                for (answer_id, answer) in answers {
                    sqlx::query(
                        "UPDATE answers SET answer = ?1, is_correct = ?2 \
                         WHERE id = ?3 AND question_id = ?4",
                    )
                    .bind(&answer.answer)
                    .bind(answer.is_correct)
                    .bind(answer_id)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            QuestionOp::Delete(id) => {
                sqlx::query("DELETE FROM questions WHERE id = ?1 AND quiz_id = ?2")
                    .bind(id)
                    .bind(quiz_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }
    tx.commit().await?;
    Ok(())
}

pub async fn delete_quiz(pool: &SqlitePool, quiz_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM quizzes WHERE id = ?1")
        .bind(quiz_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Records one like per (quiz, session). Returns whether the counter
/// actually moved, i.e. this was the session's first like of the quiz.
pub async fn like_quiz(pool: &SqlitePool, session_token: &str, quiz_id: i64) -> sqlx::Result<bool> {
    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO session_likes (session_token, quiz_id) VALUES (?1, ?2)",
    )
    .bind(session_token)
    .bind(quiz_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if inserted > 0 {
        sqlx::query("UPDATE quizzes SET likes = likes + 1 WHERE id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(inserted > 0)
}
