use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;

use crate::db::queries::sessions;
use crate::db::User;

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_URL: &str = "/accounts/login";

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

/// Guarantees a session row exists for this browser, creating an
/// anonymous one (and its cookie) on first contact.
pub async fn ensure_session(
    pool: &SqlitePool,
    jar: CookieJar,
) -> sqlx::Result<(CookieJar, String)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_owned();
        if sessions::session_exists(pool, &token).await? {
            return Ok((jar, token));
        }
    }
    let token = generate_token();
    sessions::create_session(pool, &token, None).await?;
    let jar = jar.add(session_cookie(token.clone()));
    Ok((jar, token))
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}

async fn user_from_parts<S>(parts: &Parts, state: &S) -> Result<Option<User>, sqlx::Error>
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    let pool = SqlitePool::from_ref(state);
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    sessions::get_session_user(&pool, cookie.value()).await
}

/// The authenticated user; rejects to the login page, which is how
/// every login-gated handler states its requirement.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match user_from_parts(parts, state).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            _ => Err(Redirect::to(LOGIN_URL)),
        }
    }
}

/// The authenticated user when there is one; anonymous requests pass
/// through with `None`.
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match user_from_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(e) => {
                tracing::error!("Session lookup failed: {e}");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_own_hash() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn rejects_garbage_hash() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn tokens_are_unique_enough() {
        assert_ne!(generate_token(), generate_token());
        assert_eq!(generate_token().len(), 48);
    }
}
