use serde::Deserialize;
use sqlx::SqlitePool;

use super::{
    FormErrors, INVALID_LOGIN_ERROR, PASSWORD_MISMATCH_ERROR, REQUIRED_ERROR, SAME_EMAIL_ERROR,
    SAME_USERNAME_ERROR, TOO_LONG_WORD_ERROR, WRONG_PASSWORD_ERROR,
};
use crate::auth::verify_password;
use crate::db::queries::users;
use crate::db::User;
use crate::text::has_overlong_word;

const MAX_BIO_LENGTH: usize = 500;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegistrationForm {
    /// Valid iff the username is unused, the email is present and
    /// unused, and both passwords match.
    pub async fn validate(&self, pool: &SqlitePool) -> sqlx::Result<FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.is_empty() {
            errors.add_field("username", REQUIRED_ERROR);
        } else if users::username_taken(pool, &self.username).await? {
            errors.add_field("username", SAME_USERNAME_ERROR);
        }
        if self.email.is_empty() {
            errors.add_field("email", REQUIRED_ERROR);
        } else if users::email_taken(pool, &self.email).await? {
            errors.add_field("email", SAME_EMAIL_ERROR);
        }
        if self.password1.is_empty() {
            errors.add_field("password1", REQUIRED_ERROR);
        }
        if self.password1 != self.password2 {
            errors.add_field("password2", PASSWORD_MISMATCH_ERROR);
        }
        Ok(errors)
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Returns the matched user, or errors carrying one generic message
    /// for any wrong username/password combination.
    pub async fn validate(&self, pool: &SqlitePool) -> sqlx::Result<Result<User, FormErrors>> {
        let mut errors = FormErrors::default();
        if let Some(user) = users::get_user_by_username(pool, &self.username).await? {
            if verify_password(&self.password, &user.password_hash) {
                return Ok(Ok(user));
            }
        }
        errors.add_form(INVALID_LOGIN_ERROR);
        Ok(Err(errors))
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

impl PasswordChangeForm {
    pub fn validate(&self, current_hash: &str) -> FormErrors {
        let mut errors = FormErrors::default();
        if !verify_password(&self.old_password, current_hash) {
            errors.add_field("old_password", WRONG_PASSWORD_ERROR);
        }
        if self.new_password1.is_empty() {
            errors.add_field("new_password1", REQUIRED_ERROR);
        }
        if self.new_password1 != self.new_password2 {
            errors.add_field("new_password2", PASSWORD_MISMATCH_ERROR);
        }
        errors
    }
}

/// Bio rules shared by the profile edit form.
pub fn validate_bio(description: &str) -> FormErrors {
    let mut errors = FormErrors::default();
    if description.chars().count() > MAX_BIO_LENGTH {
        errors.add_field("description", "Ensure this text has at most 500 characters.");
    }
    if has_overlong_word(description) {
        errors.add_field("description", TOO_LONG_WORD_ERROR);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bio_with_overlong_word_is_invalid() {
        let errors = validate_bio(&"x".repeat(46));
        assert_eq!(errors.for_field("description"), vec![TOO_LONG_WORD_ERROR]);
    }

    #[test]
    fn bio_with_normal_words_is_valid() {
        assert!(validate_bio("I write quizzes about birds.").is_empty());
    }

    #[test]
    fn bio_over_500_chars_is_invalid() {
        let bio = "word ".repeat(101);
        assert!(!validate_bio(&bio).is_empty());
    }

    #[test]
    fn password_change_requires_matching_confirmation() {
        let hash = crate::auth::hash_password("old").unwrap();
        let form = PasswordChangeForm {
            old_password: "old".into(),
            new_password1: "new".into(),
            new_password2: "other".into(),
        };
        let errors = form.validate(&hash);
        assert_eq!(
            errors.for_field("new_password2"),
            vec![PASSWORD_MISMATCH_ERROR]
        );
    }

    #[test]
    fn password_change_rejects_wrong_current_password() {
        let hash = crate::auth::hash_password("old").unwrap();
        let form = PasswordChangeForm {
            old_password: "wrong".into(),
            new_password1: "new".into(),
            new_password2: "new".into(),
        };
        assert_eq!(
            form.validate(&hash).for_field("old_password"),
            vec![WRONG_PASSWORD_ERROR]
        );
    }
}
