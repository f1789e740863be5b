use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::fs::create_dir_all;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::auth::{ensure_session, CurrentUser, MaybeUser};
use crate::db::queries::questions::{get_questions_with_answers, Answer, Question};
use crate::db::queries::{categories, quizzes, scores};
use crate::db::{Category, Quiz};
use crate::forms::quizzes::{
    grade_submission, parse_take_submission, AnswerInput, FilterSortQuery, QuestionInput,
    QuizFormInput, ANSWERS_PER_QUESTION,
};
use crate::forms::{clamp_question_count, FormErrors};
use crate::server::app::AppState;
use crate::telemetry::{QUIZ_LIKE_CNTR, QUIZ_TAKEN_CNTR};

use super::{ApiResponse, AppError};

const DEFAULT_QUESTION_COUNT: i64 = 10;

#[derive(Deserialize)]
struct QuestionCountQuery {
    questions: Option<String>,
}

struct QuestionCtx {
    question: Question,
    answers: Vec<Answer>,
}

#[derive(Template, WebTemplate)]
#[template(path = "quizzes/list.html", escape = "none")]
struct QuizzesListPage {
    quizzes: Vec<quizzes::QuizSummary>,
    categories: Vec<Category>,
    page: i64,
    total_pages: i64,
    author: String,
    category: String,
    sort_by: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "quizzes/detail.html", escape = "none")]
struct QuizDetailPage {
    quiz: quizzes::QuizSummary,
}

#[derive(Template, WebTemplate)]
#[template(path = "quizzes/create.html", escape = "none")]
struct CreateQuizPage {
    form: QuizFormInput,
    errors: FormErrors,
    categories: Vec<Category>,
    number_of_questions: i64,
    can_delete: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "quizzes/update.html", escape = "none")]
struct UpdateQuizPage {
    slug: String,
    form: QuizFormInput,
    errors: FormErrors,
    categories: Vec<Category>,
    number_of_questions: i64,
    can_delete: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "quizzes/confirm_delete.html", escape = "none")]
struct ConfirmDeletePage {
    quiz: Quiz,
}

#[derive(Template, WebTemplate)]
#[template(path = "quizzes/take.html", escape = "none")]
struct TakeQuizPage {
    quiz: Quiz,
    questions: Vec<QuestionCtx>,
}

#[derive(Template, WebTemplate)]
#[template(path = "quizzes/score.html", escape = "none")]
struct ScorePage {
    quiz: Quiz,
    score: usize,
    percentage: i64,
    saved: bool,
}

fn blank_question() -> QuestionInput {
    QuestionInput {
        answers: vec![AnswerInput::default(); ANSWERS_PER_QUESTION],
        ..QuestionInput::default()
    }
}

fn blank_form(number_of_questions: i64) -> QuizFormInput {
    QuizFormInput {
        questions: vec![blank_question(); number_of_questions as usize],
        ..QuizFormInput::default()
    }
}

async fn list(
    State(pool): State<SqlitePool>,
    Query(query): Query<FilterSortQuery>,
) -> ApiResponse<QuizzesListPage> {
    let filter = quizzes::QuizFilter {
        author: query.author.clone().filter(|a| !a.is_empty()),
        category: query.category.clone(),
        sort_by: query.sort_by.clone(),
        page: query.page_number(),
    };
    let page = quizzes::list_quizzes(&pool, &filter).await?;
    Ok(QuizzesListPage {
        quizzes: page.quizzes,
        categories: categories::get_all_categories(&pool).await?,
        page: page.page,
        total_pages: page.total_pages,
        author: query.author.unwrap_or_default(),
        category: query.category.unwrap_or_default(),
        sort_by: query.sort_by.unwrap_or_default(),
    })
}

async fn detail(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> ApiResponse<QuizDetailPage> {
    let quiz = quizzes::get_summary_by_slug(&pool, &slug).await?;
    Ok(QuizDetailPage { quiz })
}

async fn create_page(
    CurrentUser(_user): CurrentUser,
    State(pool): State<SqlitePool>,
    Query(query): Query<QuestionCountQuery>,
) -> ApiResponse<CreateQuizPage> {
    let number_of_questions =
        clamp_question_count(query.questions.as_deref(), DEFAULT_QUESTION_COUNT);
    Ok(CreateQuizPage {
        form: blank_form(number_of_questions),
        errors: FormErrors::default(),
        categories: categories::get_all_categories(&pool).await?,
        number_of_questions,
        can_delete: false,
    })
}

/// Drains the multipart quiz form into flat (name, value) pairs plus the
/// optional thumbnail, spooled to a temp file until validation passes.
async fn collect_quiz_form(
    mut multipart: Multipart,
) -> Result<(Vec<(String, String)>, Option<(String, NamedTempFile)>), AppError> {
    let mut pairs = Vec::new();
    let mut thumbnail = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let file_name = field.file_name().filter(|f| !f.is_empty()).map(str::to_owned);
        match file_name {
            Some(file_name) if name == "thumbnail" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Malformed form: {e}")))?;
                let mut file = NamedTempFile::new()
                    .map_err(|e| AppError::BadRequest(format!("Cannot spool upload: {e}")))?;
                file.write_all(&bytes)
                    .map_err(|e| AppError::BadRequest(format!("Cannot spool upload: {e}")))?;
                thumbnail = Some((file_name, file));
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Malformed form: {e}")))?;
                pairs.push((name, value));
            }
        }
    }
    Ok((pairs, thumbnail))
}

fn persist_thumbnail(static_dir: &PathBuf, file: Option<(String, NamedTempFile)>) {
    if let Some((file_name, contents)) = file {
        let dir = static_dir.join("quiz_thumbnails");
        if let Err(e) = create_dir_all(&dir) {
            tracing::error!("Cannot create thumbnail dir: {e}");
            return;
        }
        if let Err(e) = contents.persist(dir.join(&file_name)) {
            tracing::error!("Cannot store thumbnail: {e}");
        }
    }
}

async fn create(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
    State(static_dir): State<PathBuf>,
    multipart: Multipart,
) -> ApiResponse<Response> {
    let (pairs, file) = collect_quiz_form(multipart).await?;
    let mut form = QuizFormInput::from_pairs(&pairs);
    if let Some((file_name, _)) = &file {
        form.thumbnail = Some(format!("quiz_thumbnails/{file_name}"));
    }

    let errors = form.validate(&pool, None).await?;
    if !errors.is_empty() {
        let number_of_questions = form.questions.len().max(1) as i64;
        return Ok(CreateQuizPage {
            form,
            errors,
            categories: categories::get_all_categories(&pool).await?,
            number_of_questions,
            can_delete: false,
        }
        .into_response());
    }

    persist_thumbnail(&static_dir, file);
    let quiz_id =
        quizzes::create_quiz_with_questions(&pool, user.id, &form.meta(), &form.new_questions())
            .await?;
    tracing::info!("User {} created quiz {quiz_id}", user.username);
    Ok(Redirect::to("/accounts/profile").into_response())
}

/// The stored quiz tree rendered back into form blocks.
fn prefilled_form(quiz: &Quiz, questions: Vec<(Question, Vec<Answer>)>) -> QuizFormInput {
    QuizFormInput {
        title: quiz.title.clone(),
        description: quiz.description.clone(),
        category_id: quiz.category_id,
        thumbnail: quiz.thumbnail.clone(),
        questions: questions
            .into_iter()
            .map(|(question, answers)| QuestionInput {
                id: Some(question.id),
                question: question.question,
                delete: false,
                answers: answers
                    .into_iter()
                    .map(|answer| AnswerInput {
                        id: Some(answer.id),
                        answer: answer.answer,
                        is_correct: answer.is_correct,
                    })
                    .collect(),
            })
            .collect(),
    }
}

async fn authored_quiz(pool: &SqlitePool, slug: &str, user_id: i64) -> Result<Quiz, AppError> {
    let quiz = quizzes::get_quiz_by_slug(pool, slug).await?;
    if quiz.author_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(quiz)
}

async fn update_page(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
    Query(query): Query<QuestionCountQuery>,
) -> ApiResponse<UpdateQuizPage> {
    let quiz = authored_quiz(&pool, &slug, user.id).await?;
    let questions = get_questions_with_answers(&pool, quiz.id).await?;
    let number_of_questions =
        clamp_question_count(query.questions.as_deref(), questions.len() as i64);

    let mut form = prefilled_form(&quiz, questions);
    while (form.questions.len() as i64) < number_of_questions {
        form.questions.push(blank_question());
    }

    Ok(UpdateQuizPage {
        slug,
        form,
        errors: FormErrors::default(),
        categories: categories::get_all_categories(&pool).await?,
        number_of_questions,
        can_delete: true,
    })
}

async fn update(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
    State(static_dir): State<PathBuf>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> ApiResponse<Response> {
    let quiz = authored_quiz(&pool, &slug, user.id).await?;
    let (pairs, file) = collect_quiz_form(multipart).await?;
    let mut form = QuizFormInput::from_pairs(&pairs);
    if let Some((file_name, _)) = &file {
        form.thumbnail = Some(format!("quiz_thumbnails/{file_name}"));
    } else {
        // No upload keeps the stored thumbnail.
        form.thumbnail = None;
    }

    // The deletion count is validated before anything is written, so an
    // update that would leave the quiz without questions is rejected
    // here instead of cascading into a quiz deletion.
    let errors = form.validate(&pool, Some(quiz.id)).await?;
    if !errors.is_empty() {
        let number_of_questions = form.questions.len().max(1) as i64;
        return Ok(UpdateQuizPage {
            slug,
            form,
            errors,
            categories: categories::get_all_categories(&pool).await?,
            number_of_questions,
            can_delete: true,
        }
        .into_response());
    }

    persist_thumbnail(&static_dir, file);
    quizzes::update_quiz_with_questions(&pool, quiz.id, &form.meta(), &form.question_ops())
        .await?;
    tracing::info!("User {} updated quiz {}", user.username, quiz.id);
    Ok(Redirect::to("/accounts/profile").into_response())
}

async fn confirm_delete(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> ApiResponse<ConfirmDeletePage> {
    let quiz = authored_quiz(&pool, &slug, user.id).await?;
    Ok(ConfirmDeletePage { quiz })
}

async fn delete(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> ApiResponse<Response> {
    let quiz = authored_quiz(&pool, &slug, user.id).await?;
    quizzes::delete_quiz(&pool, quiz.id).await?;
    tracing::info!("User {} deleted quiz {}", user.username, quiz.id);
    Ok(Redirect::to("/accounts/profile").into_response())
}

async fn take_page(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> ApiResponse<TakeQuizPage> {
    let quiz = quizzes::get_quiz_by_slug(&pool, &slug).await?;
    let questions = get_questions_with_answers(&pool, quiz.id)
        .await?
        .into_iter()
        .map(|(question, answers)| QuestionCtx { question, answers })
        .collect();
    Ok(TakeQuizPage { quiz, questions })
}

async fn take(
    MaybeUser(user): MaybeUser,
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> ApiResponse<ScorePage> {
    let quiz = quizzes::get_quiz_by_slug(&pool, &slug).await?;
    let questions = get_questions_with_answers(&pool, quiz.id).await?;
    let choices = parse_take_submission(&pairs);
    let (score, percentage) = grade_submission(&questions, &choices);

    // Anonymous attempts are graded and shown but never persisted.
    let saved = if let Some(user) = user {
        scores::create_score(&pool, user.id, quiz.id, percentage).await?;
        true
    } else {
        false
    };
    QUIZ_TAKEN_CNTR.with_label_values(&[&quiz.slug]).inc();

    Ok(ScorePage {
        quiz,
        score,
        percentage,
        saved,
    })
}

async fn like(
    State(pool): State<SqlitePool>,
    jar: CookieJar,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> ApiResponse<Response> {
    let is_ajax = headers
        .get("x-requested-with")
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"XMLHttpRequest"));
    if !is_ajax {
        return Err(AppError::BadRequest("Expected an XMLHttpRequest".into()));
    }
    let quiz = quizzes::get_quiz_by_slug(&pool, &slug).await?;
    let (jar, token) = ensure_session(&pool, jar).await?;
    // First like from this session moves the counter; repeats are no-ops.
    if quizzes::like_quiz(&pool, &token, quiz.id).await? {
        QUIZ_LIKE_CNTR.with_label_values(&[&quiz.slug]).inc();
    }
    Ok((jar, StatusCode::OK).into_response())
}

pub fn quizzes_router(state: AppState) -> Router {
    Router::new()
        .route("/quizzes", get(list))
        .route("/quizzes/create", get(create_page).post(create))
        .route("/quizzes/{slug}", get(detail))
        .route("/quizzes/{slug}/edit", get(update_page).post(update))
        .route("/quizzes/{slug}/delete", get(confirm_delete).post(delete))
        .route("/quizzes/{slug}/take", get(take_page).post(take))
        .route("/quizzes/{slug}/like", post(like))
        .with_state(state)
}
