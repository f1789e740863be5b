use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use sqlx::SqlitePool;
use std::fs::create_dir_all;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::auth::{self, CurrentUser, SESSION_COOKIE};
use crate::db::queries::{quizzes, sessions, users};
use crate::db::{Profile, Quiz, User};
use crate::forms::accounts::{validate_bio, LoginForm, PasswordChangeForm, RegistrationForm};
use crate::forms::FormErrors;
use crate::server::app::AppState;

use super::ApiResponse;

#[derive(Template, WebTemplate)]
#[template(path = "accounts/register.html", escape = "none")]
struct RegisterPage {
    form: RegistrationForm,
    errors: FormErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "accounts/login.html", escape = "none")]
struct LoginPage {
    form: LoginForm,
    errors: FormErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "accounts/password_change.html", escape = "none")]
struct PasswordChangePage {
    errors: FormErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "accounts/profile.html", escape = "none")]
struct ProfilePage {
    user: User,
    profile: Profile,
    quizzes: Vec<Quiz>,
    errors: FormErrors,
}

async fn register_page() -> RegisterPage {
    RegisterPage {
        form: RegistrationForm::default(),
        errors: FormErrors::default(),
    }
}

async fn register(
    State(pool): State<SqlitePool>,
    Form(form): Form<RegistrationForm>,
) -> ApiResponse<Response> {
    let errors = form.validate(&pool).await?;
    if !errors.is_empty() {
        return Ok(RegisterPage { form, errors }.into_response());
    }
    let password_hash = auth::hash_password(&form.password1)
        .map_err(|e| super::AppError::BadRequest(format!("Unusable password: {e}")))?;
    users::create_user(&pool, &form.username, &form.email, &password_hash).await?;
    tracing::info!("Registered user {}", form.username);
    Ok(Redirect::to("/accounts/login").into_response())
}

async fn login_page() -> LoginPage {
    LoginPage {
        form: LoginForm::default(),
        errors: FormErrors::default(),
    }
}

async fn login(
    State(pool): State<SqlitePool>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> ApiResponse<Response> {
    match form.validate(&pool).await? {
        Ok(user) => {
            let token = auth::generate_token();
            sessions::create_session(&pool, &token, Some(user.id)).await?;
            let jar = jar.add(auth::session_cookie(token));
            Ok((jar, Redirect::to("/accounts/profile")).into_response())
        }
        Err(errors) => Ok(LoginPage { form, errors }.into_response()),
    }
}

async fn logout(State(pool): State<SqlitePool>, jar: CookieJar) -> ApiResponse<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        sessions::delete_session(&pool, cookie.value()).await?;
    }
    let jar = jar.remove(SESSION_COOKIE);
    Ok((jar, Redirect::to("/")).into_response())
}

async fn password_change_page(CurrentUser(_user): CurrentUser) -> PasswordChangePage {
    PasswordChangePage {
        errors: FormErrors::default(),
    }
}

async fn password_change(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
    Form(form): Form<PasswordChangeForm>,
) -> ApiResponse<Response> {
    let errors = form.validate(&user.password_hash);
    if !errors.is_empty() {
        return Ok(PasswordChangePage { errors }.into_response());
    }
    let password_hash = auth::hash_password(&form.new_password1)
        .map_err(|e| super::AppError::BadRequest(format!("Unusable password: {e}")))?;
    users::update_password(&pool, user.id, &password_hash).await?;
    Ok(Redirect::to("/accounts/profile").into_response())
}

async fn profile_page(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
) -> ApiResponse<ProfilePage> {
    let profile = users::get_profile(&pool, user.id).await?;
    let quizzes = quizzes::get_quizzes_for_author(&pool, user.id).await?;
    Ok(ProfilePage {
        user,
        profile,
        quizzes,
        errors: FormErrors::default(),
    })
}

#[derive(TryFromMultipart)]
struct ProfileUpdateForm {
    #[form_data(default)]
    description: String,
    #[form_data(limit = "10MiB")]
    photo: Option<FieldData<NamedTempFile>>,
}

async fn update_profile(
    CurrentUser(user): CurrentUser,
    State(pool): State<SqlitePool>,
    State(static_dir): State<PathBuf>,
    TypedMultipart(form): TypedMultipart<ProfileUpdateForm>,
) -> ApiResponse<Response> {
    let errors = validate_bio(&form.description);
    if !errors.is_empty() {
        let profile = users::get_profile(&pool, user.id).await?;
        let quizzes = quizzes::get_quizzes_for_author(&pool, user.id).await?;
        return Ok(ProfilePage {
            user,
            profile,
            quizzes,
            errors,
        }
        .into_response());
    }

    let photo = form.photo.and_then(|photo| {
        let file_name = photo.metadata.file_name.filter(|f| !f.is_empty())?;
        let dir = static_dir.join("profile_photos");
        if let Err(e) = create_dir_all(&dir) {
            tracing::error!("Cannot create photo dir: {e}");
            return None;
        }
        match photo.contents.persist(dir.join(&file_name)) {
            Ok(_) => Some(format!("profile_photos/{file_name}")),
            Err(e) => {
                tracing::error!("Cannot store photo: {e}");
                None
            }
        }
    });
    users::update_profile(&pool, user.id, &form.description, photo.as_deref()).await?;
    Ok(Redirect::to("/accounts/profile").into_response())
}

pub fn accounts_router(state: AppState) -> Router {
    Router::new()
        .route("/accounts/register", get(register_page).post(register))
        .route("/accounts/login", get(login_page).post(login))
        .route("/accounts/logout", post(logout))
        .route(
            "/accounts/password_change",
            get(password_change_page).post(password_change),
        )
        .route("/accounts/profile", get(profile_page).post(update_profile))
        .with_state(state)
}
