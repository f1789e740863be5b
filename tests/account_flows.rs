mod common;

use common::{create_user, test_pool};
use quizhub::auth::{hash_password, verify_password};
use quizhub::db::queries::sessions::{
    create_session, delete_session, get_session_user, session_exists,
};
use quizhub::db::queries::users;
use quizhub::forms::accounts::{LoginForm, RegistrationForm};
use quizhub::forms::{
    INVALID_LOGIN_ERROR, PASSWORD_MISMATCH_ERROR, REQUIRED_ERROR, SAME_EMAIL_ERROR,
    SAME_USERNAME_ERROR,
};

fn registration(username: &str, email: &str) -> RegistrationForm {
    RegistrationForm {
        username: username.to_owned(),
        email: email.to_owned(),
        password1: "hunter22".to_owned(),
        password2: "hunter22".to_owned(),
    }
}

#[tokio::test]
async fn registration_creates_a_user_with_an_empty_profile() {
    let pool = test_pool().await;
    let form = registration("newuser", "newuser@example.com");
    assert!(form.validate(&pool).await.unwrap().is_empty());

    let hash = hash_password(&form.password1).unwrap();
    let user_id = users::create_user(&pool, &form.username, &form.email, &hash)
        .await
        .unwrap();

    let user = users::get_user(&pool, user_id).await.unwrap();
    assert_eq!(user.username, "newuser");
    let profile = users::get_profile(&pool, user_id).await.unwrap();
    assert_eq!(profile.description, "");
    assert_eq!(profile.photo, None);
}

#[tokio::test]
async fn registration_rejects_taken_username_and_email() {
    let pool = test_pool().await;
    create_user(&pool, "taken").await;

    let errors = registration("taken", "other@example.com")
        .validate(&pool)
        .await
        .unwrap();
    assert_eq!(errors.for_field("username"), vec![SAME_USERNAME_ERROR]);

    let errors = registration("fresh", "taken@example.com")
        .validate(&pool)
        .await
        .unwrap();
    assert_eq!(errors.for_field("email"), vec![SAME_EMAIL_ERROR]);
}

#[tokio::test]
async fn registration_requires_email_and_matching_passwords() {
    let pool = test_pool().await;

    let mut form = registration("newuser", "");
    form.password2 = "different".to_owned();
    let errors = form.validate(&pool).await.unwrap();
    assert_eq!(errors.for_field("email"), vec![REQUIRED_ERROR]);
    assert_eq!(errors.for_field("password2"), vec![PASSWORD_MISMATCH_ERROR]);
}

#[tokio::test]
async fn login_checks_the_stored_hash() {
    let pool = test_pool().await;
    let hash = hash_password("hunter22").unwrap();
    users::create_user(&pool, "alice", "alice@example.com", &hash)
        .await
        .unwrap();

    let form = LoginForm {
        username: "alice".to_owned(),
        password: "hunter22".to_owned(),
    };
    let user = form.validate(&pool).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");

    let form = LoginForm {
        username: "alice".to_owned(),
        password: "wrong".to_owned(),
    };
    let errors = form.validate(&pool).await.unwrap().unwrap_err();
    assert!(errors
        .form_errors()
        .contains(&INVALID_LOGIN_ERROR.to_owned()));

    // Unknown usernames get the same generic message.
    let form = LoginForm {
        username: "nobody".to_owned(),
        password: "hunter22".to_owned(),
    };
    let errors = form.validate(&pool).await.unwrap().unwrap_err();
    assert!(errors
        .form_errors()
        .contains(&INVALID_LOGIN_ERROR.to_owned()));
}

#[tokio::test]
async fn password_hashes_verify_and_differ_per_salt() {
    let first = hash_password("hunter22").unwrap();
    let second = hash_password("hunter22").unwrap();
    assert_ne!(first, second);
    assert!(verify_password("hunter22", &first));
    assert!(verify_password("hunter22", &second));
    assert!(!verify_password("wrong", &first));
    assert!(!verify_password("hunter22", "not a hash"));
}

#[tokio::test]
async fn session_lifecycle() {
    let pool = test_pool().await;
    let user_id = create_user(&pool, "alice").await;

    create_session(&pool, "anon-token", None).await.unwrap();
    assert!(session_exists(&pool, "anon-token").await.unwrap());
    assert!(get_session_user(&pool, "anon-token")
        .await
        .unwrap()
        .is_none());

    create_session(&pool, "user-token", Some(user_id))
        .await
        .unwrap();
    let user = get_session_user(&pool, "user-token").await.unwrap().unwrap();
    assert_eq!(user.id, user_id);

    delete_session(&pool, "user-token").await.unwrap();
    assert!(!session_exists(&pool, "user-token").await.unwrap());
    assert!(get_session_user(&pool, "user-token")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn profile_update_keeps_photo_when_none_is_sent() {
    let pool = test_pool().await;
    let user_id = create_user(&pool, "alice").await;

    users::update_profile(&pool, user_id, "about me", Some("profile_photos/alice.png"))
        .await
        .unwrap();
    users::update_profile(&pool, user_id, "new bio", None)
        .await
        .unwrap();

    let profile = users::get_profile(&pool, user_id).await.unwrap();
    assert_eq!(profile.description, "new bio");
    assert_eq!(profile.photo.as_deref(), Some("profile_photos/alice.png"));
}

#[tokio::test]
async fn password_change_is_persisted() {
    let pool = test_pool().await;
    let hash = hash_password("old-password").unwrap();
    let user_id = users::create_user(&pool, "alice", "alice@example.com", &hash)
        .await
        .unwrap();

    let new_hash = hash_password("new-password").unwrap();
    users::update_password(&pool, user_id, &new_hash).await.unwrap();

    let user = users::get_user(&pool, user_id).await.unwrap();
    assert!(verify_password("new-password", &user.password_hash));
    assert!(!verify_password("old-password", &user.password_hash));
}
