const MAX_WORD_LENGTH: usize = 45;

/// A text fails the word-length rule when any whitespace-delimited word
/// is longer than 45 characters.
pub fn has_overlong_word(text: &str) -> bool {
    text.split_whitespace()
        .any(|word| word.chars().count() > MAX_WORD_LENGTH)
}

/// Derives a URL-safe slug from a title: lowercased, alphanumeric runs
/// joined by single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_words_pass() {
        assert!(!has_overlong_word("a perfectly ordinary description"));
    }

    #[test]
    fn empty_text_passes() {
        assert!(!has_overlong_word(""));
    }

    #[test]
    fn word_of_45_chars_passes() {
        let word = "a".repeat(45);
        assert!(!has_overlong_word(&format!("prefix {word} suffix")));
    }

    #[test]
    fn word_of_46_chars_fails() {
        let word = "a".repeat(46);
        assert!(has_overlong_word(&format!("prefix {word} suffix")));
    }

    #[test]
    fn slugify_joins_words_with_hyphens() {
        assert_eq!(slugify("Quiz title"), "quiz-title");
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("  Rust: The (Hard) Parts!  "), "rust-the-hard-parts");
    }
}
