pub mod accounts;
pub mod quizzes;

pub const REQUIRED_ERROR: &str = "This field is required.";
pub const TOO_LONG_WORD_ERROR: &str = "Any word should not be longer than 45 characters.";
pub const SAME_USERNAME_ERROR: &str = "An account with the same username already exists!";
pub const SAME_EMAIL_ERROR: &str = "An account with the same email already exists!";
pub const PASSWORD_MISMATCH_ERROR: &str = "The two password fields didn't match.";
pub const WRONG_PASSWORD_ERROR: &str = "Your current password was entered incorrectly.";
pub const INVALID_LOGIN_ERROR: &str = "Please enter a correct username and password.";
pub const SAME_QUIZ_TITLE_ERROR: &str = "Quiz with the same title already exists!";
pub const SAME_CATEGORY_TITLE_ERROR: &str = "Category with the same title already exists!";
pub const ONE_CORRECT_ANSWER_ERROR: &str =
    "Exactly one of the answers must be marked as correct!";
pub const DELETE_ALL_QUESTIONS_ERROR: &str = "You can not delete all questions! \
     If you want to delete the entire quiz, you can do it on the profile page.";
pub const NO_QUESTIONS_ERROR: &str = "A quiz must have at least one question!";

/// Validation outcome of a submitted form: messages tied to a field
/// plus form-level ones. An empty collection means the form is valid.
#[derive(Debug, Default, Clone)]
pub struct FormErrors {
    fields: Vec<(String, String)>,
    form: Vec<String>,
}

impl FormErrors {
    pub fn add_field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.push((field.into(), message.into()));
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.form.contains(&message) {
            self.form.push(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    pub fn for_field(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(field, _)| field == name)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    /// Flat view for templates: field errors prefixed with their field,
    /// then the form-level ones.
    pub fn all(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .chain(self.form.iter().cloned())
            .collect()
    }
}

/// Requested question-block counts outside 1..=20 fall back (below 1 or
/// unparsable) or clamp (above 20).
pub fn clamp_question_count(raw: Option<&str>, fallback: i64) -> i64 {
    match raw.and_then(|v| v.parse::<i64>().ok()) {
        None => fallback,
        Some(n) if n < 1 => fallback,
        Some(n) if n > 20 => 20,
        Some(n) => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_count_falls_back() {
        assert_eq!(clamp_question_count(None, 10), 10);
    }

    #[test]
    fn non_integer_count_falls_back() {
        assert_eq!(clamp_question_count(Some("not-int"), 10), 10);
    }

    #[test]
    fn count_below_one_falls_back() {
        assert_eq!(clamp_question_count(Some("-5"), 10), 10);
        assert_eq!(clamp_question_count(Some("0"), 7), 7);
    }

    #[test]
    fn count_above_twenty_clamps() {
        assert_eq!(clamp_question_count(Some("25"), 10), 20);
    }

    #[test]
    fn count_in_range_passes_through() {
        assert_eq!(clamp_question_count(Some("15"), 10), 15);
    }

    #[test]
    fn form_level_errors_deduplicate() {
        let mut errors = FormErrors::default();
        errors.add_form(ONE_CORRECT_ANSWER_ERROR);
        errors.add_form(ONE_CORRECT_ANSWER_ERROR);
        assert_eq!(errors.form_errors().len(), 1);
    }
}
