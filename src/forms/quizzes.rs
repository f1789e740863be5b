use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use sqlx::SqlitePool;

use super::{
    FormErrors, DELETE_ALL_QUESTIONS_ERROR, NO_QUESTIONS_ERROR, ONE_CORRECT_ANSWER_ERROR,
    REQUIRED_ERROR, SAME_QUIZ_TITLE_ERROR, TOO_LONG_WORD_ERROR,
};
use crate::db::queries::questions::{Answer, Question};
use crate::db::queries::quizzes::{self, NewAnswer, NewQuestion, QuestionOp, QuizMeta};
use crate::text::{has_overlong_word, slugify};

pub const ANSWERS_PER_QUESTION: usize = 4;

const MAX_TITLE_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;
const MAX_QUESTION_LENGTH: usize = 300;
const MAX_ANSWER_LENGTH: usize = 100;

#[derive(Debug, Default, Clone)]
pub struct AnswerInput {
    pub id: Option<i64>,
    pub answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Default, Clone)]
pub struct QuestionInput {
    pub id: Option<i64>,
    pub question: String,
    pub delete: bool,
    pub answers: Vec<AnswerInput>,
}

impl QuestionInput {
    /// An untouched extra block: no stored id, nothing typed in.
    fn is_blank(&self) -> bool {
        self.id.is_none()
            && self.question.is_empty()
            && self.answers.iter().all(|a| a.answer.is_empty() && !a.is_correct)
    }
}

/// The quiz authoring form: metadata plus its question blocks, decoded
/// from the flat field names the nested form posts
/// (`questions-{i}-question`, `questions-{i}-answers-{j}-answer`, ...).
#[derive(Debug, Default, Clone)]
pub struct QuizFormInput {
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub thumbnail: Option<String>,
    pub questions: Vec<QuestionInput>,
}

impl QuizFormInput {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = QuizFormInput::default();
        let mut blocks: BTreeMap<usize, QuestionInput> = BTreeMap::new();

        for (key, value) in pairs {
            match key.as_str() {
                "title" => form.title = value.trim().to_owned(),
                "description" => form.description = value.trim().to_owned(),
                "category" => form.category_id = value.parse().ok(),
                _ => {
                    let Some(rest) = key.strip_prefix("questions-") else {
                        continue;
                    };
                    let Some((index, field)) = rest.split_once('-') else {
                        continue;
                    };
                    let Ok(index) = index.parse::<usize>() else {
                        continue;
                    };
                    let block = blocks.entry(index).or_insert_with(|| QuestionInput {
                        answers: vec![AnswerInput::default(); ANSWERS_PER_QUESTION],
                        ..QuestionInput::default()
                    });
                    match field {
                        "id" => block.id = value.parse().ok(),
                        "question" => block.question = value.trim().to_owned(),
                        "DELETE" => block.delete = value == "on",
                        _ => {
                            let Some(rest) = field.strip_prefix("answers-") else {
                                continue;
                            };
                            let Some((answer_index, answer_field)) = rest.split_once('-') else {
                                continue;
                            };
                            let Some(answer) = answer_index
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| block.answers.get_mut(i))
                            else {
                                continue;
                            };
                            match answer_field {
                                "id" => answer.id = value.parse().ok(),
                                "answer" => answer.answer = value.trim().to_owned(),
                                "is_correct" => answer.is_correct = value == "on",
                                _ => {}
                            }
                        }
                    }
                }
            }
        }

        // Untouched extra blocks are dropped, not validated.
        form.questions = blocks
            .into_values()
            .filter(|block| !block.is_blank())
            .collect();
        form
    }

    /// Runs the full validation pass: per-field constraints, then title
    /// uniqueness, then the one-correct-answer rule per block, then the
    /// at-least-one-question rule. Nothing is persisted here.
    pub async fn validate(
        &self,
        pool: &SqlitePool,
        exclude_quiz: Option<i64>,
    ) -> sqlx::Result<FormErrors> {
        let mut errors = FormErrors::default();

        if self.title.is_empty() {
            errors.add_field("title", REQUIRED_ERROR);
        } else if self.title.chars().count() > MAX_TITLE_LENGTH {
            errors.add_field("title", "Ensure this title has at most 100 characters.");
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            errors.add_field(
                "description",
                "Ensure this text has at most 500 characters.",
            );
        }
        if has_overlong_word(&self.description) {
            errors.add_field("description", TOO_LONG_WORD_ERROR);
        }

        for (index, block) in self.surviving().enumerate() {
            let field = |suffix: &str| format!("questions-{index}-{suffix}");
            if block.question.is_empty() {
                errors.add_field(field("question"), REQUIRED_ERROR);
            } else if block.question.chars().count() > MAX_QUESTION_LENGTH {
                errors.add_field(
                    field("question"),
                    "Ensure this question has at most 300 characters.",
                );
            }
            if has_overlong_word(&block.question) {
                errors.add_field(field("question"), TOO_LONG_WORD_ERROR);
            }
            for (answer_index, answer) in block.answers.iter().enumerate() {
                if answer.answer.is_empty() {
                    errors.add_field(field(&format!("answers-{answer_index}-answer")), REQUIRED_ERROR);
                } else if answer.answer.chars().count() > MAX_ANSWER_LENGTH {
                    errors.add_field(
                        field(&format!("answers-{answer_index}-answer")),
                        "Ensure this answer has at most 100 characters.",
                    );
                }
            }
        }

        if !self.title.is_empty()
            && quizzes::quiz_title_taken(pool, &self.title, exclude_quiz).await?
        {
            errors.add_form(SAME_QUIZ_TITLE_ERROR);
        }

        for block in self.surviving() {
            let correct = block.answers.iter().filter(|a| a.is_correct).count();
            if correct != 1 {
                errors.add_form(ONE_CORRECT_ANSWER_ERROR);
            }
        }

        if self.surviving().count() == 0 {
            if exclude_quiz.is_some() {
                errors.add_form(DELETE_ALL_QUESTIONS_ERROR);
            } else {
                errors.add_form(NO_QUESTIONS_ERROR);
            }
        }

        Ok(errors)
    }

    fn surviving(&self) -> impl Iterator<Item = &QuestionInput> {
        self.questions.iter().filter(|block| !block.delete)
    }

    pub fn meta(&self) -> QuizMeta {
        QuizMeta {
            title: self.title.clone(),
            slug: slugify(&self.title),
            description: self.description.clone(),
            thumbnail: self.thumbnail.clone(),
            category_id: self.category_id,
        }
    }

    /// Question tree for a create: every surviving block inserts.
    pub fn new_questions(&self) -> Vec<NewQuestion> {
        self.surviving()
            .map(|block| NewQuestion {
                question: block.question.clone(),
                answers: block
                    .answers
                    .iter()
                    .map(|a| NewAnswer {
                        answer: a.answer.clone(),
                        is_correct: a.is_correct,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Per-block operations for an update: stored blocks update or
    /// delete, fresh ones insert.
    pub fn question_ops(&self) -> Vec<QuestionOp> {
        self.questions
            .iter()
            .filter_map(|block| match (block.id, block.delete) {
                (Some(id), true) => Some(QuestionOp::Delete(id)),
                (Some(id), false) => Some(QuestionOp::Update {
                    id,
                    question: block.question.clone(),
                    answers: block
                        .answers
                        .iter()
                        .filter_map(|a| {
                            a.id.map(|answer_id| {
                                (
                                    answer_id,
                                    NewAnswer {
                                        answer: a.answer.clone(),
                                        is_correct: a.is_correct,
                                    },
                                )
                            })
                        })
                        .collect(),
                }),
                (None, true) => None,
                (None, false) => Some(QuestionOp::Insert(NewQuestion {
                    question: block.question.clone(),
                    answers: block
                        .answers
                        .iter()
                        .map(|a| NewAnswer {
                            answer: a.answer.clone(),
                            is_correct: a.is_correct,
                        })
                        .collect(),
                })),
            })
            .collect()
    }
}

/// Chosen answer ids keyed by question id, decoded from
/// `question-{id}` radio fields. Anything unparsable is dropped, which
/// grades as "unanswered".
pub fn parse_take_submission(pairs: &[(String, String)]) -> HashMap<i64, i64> {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            let question_id = key.strip_prefix("question-")?.parse().ok()?;
            let answer_id = value.parse().ok()?;
            Some((question_id, answer_id))
        })
        .collect()
}

/// Counts questions whose chosen answer is the correct one. Unanswered
/// questions and choices outside the question's own answers count as
/// incorrect, never as an error.
pub fn grade_submission(
    questions: &[(Question, Vec<Answer>)],
    choices: &HashMap<i64, i64>,
) -> (usize, i64) {
    let correct = questions
        .iter()
        .filter(|(question, answers)| {
            choices
                .get(&question.id)
                .is_some_and(|chosen| answers.iter().any(|a| a.id == *chosen && a.is_correct))
        })
        .count();
    let percentage = if questions.is_empty() {
        0
    } else {
        (correct * 100 / questions.len()) as i64
    };
    (correct, percentage)
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FilterSortQuery {
    pub page: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
}

impl FilterSortQuery {
    pub fn page_number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn one_question_form() -> Vec<(String, String)> {
        pairs(&[
            ("title", "Quiz title"),
            ("description", "Quiz description"),
            ("questions-0-question", "What is the answer?"),
            ("questions-0-answers-0-answer", "A"),
            ("questions-0-answers-1-answer", "B"),
            ("questions-0-answers-2-answer", "C"),
            ("questions-0-answers-3-answer", "D"),
            ("questions-0-answers-3-is_correct", "on"),
        ])
    }

    #[test]
    fn parses_nested_question_blocks() {
        let form = QuizFormInput::from_pairs(&one_question_form());
        assert_eq!(form.title, "Quiz title");
        assert_eq!(form.questions.len(), 1);
        let block = &form.questions[0];
        assert_eq!(block.question, "What is the answer?");
        assert_eq!(block.answers.len(), 4);
        assert!(block.answers[3].is_correct);
        assert!(!block.answers[0].is_correct);
    }

    #[test]
    fn blank_extra_blocks_are_dropped() {
        let mut entries = one_question_form();
        entries.extend(pairs(&[
            ("questions-1-question", ""),
            ("questions-1-answers-0-answer", ""),
            ("questions-1-answers-1-answer", ""),
            ("questions-1-answers-2-answer", ""),
            ("questions-1-answers-3-answer", ""),
        ]));
        let form = QuizFormInput::from_pairs(&entries);
        assert_eq!(form.questions.len(), 1);
    }

    #[test]
    fn keeps_stored_ids_and_delete_marks() {
        let form = QuizFormInput::from_pairs(&pairs(&[
            ("questions-0-id", "7"),
            ("questions-0-question", "Old question"),
            ("questions-0-DELETE", "on"),
            ("questions-0-answers-0-id", "21"),
            ("questions-0-answers-0-answer", "A"),
        ]));
        let block = &form.questions[0];
        assert_eq!(block.id, Some(7));
        assert!(block.delete);
        assert_eq!(block.answers[0].id, Some(21));
        assert!(matches!(form.question_ops()[0], QuestionOp::Delete(7)));
    }

    fn question_with_answers(id: i64, correct: i64) -> (Question, Vec<Answer>) {
        let answers = (0..4)
            .map(|i| Answer {
                id: id * 10 + i,
                question_id: id,
                answer: format!("answer {i}"),
                is_correct: id * 10 + i == correct,
            })
            .collect();
        (
            Question {
                id,
                quiz_id: 1,
                question: format!("question {id}"),
            },
            answers,
        )
    }

    #[test]
    fn grades_all_correct_as_100() {
        let questions = vec![question_with_answers(1, 13)];
        let choices = HashMap::from([(1, 13)]);
        assert_eq!(grade_submission(&questions, &choices), (1, 100));
    }

    #[test]
    fn grades_wrong_choice_as_0() {
        let questions = vec![question_with_answers(1, 13)];
        let choices = HashMap::from([(1, 11)]);
        assert_eq!(grade_submission(&questions, &choices), (0, 0));
    }

    #[test]
    fn unanswered_questions_count_as_incorrect() {
        let questions = vec![question_with_answers(1, 13), question_with_answers(2, 21)];
        let choices = HashMap::from([(2, 21)]);
        assert_eq!(grade_submission(&questions, &choices), (1, 50));
    }

    #[test]
    fn percentage_floors() {
        let questions = vec![
            question_with_answers(1, 13),
            question_with_answers(2, 21),
            question_with_answers(3, 31),
        ];
        let choices = HashMap::from([(1, 13)]);
        // 1/3 -> 33, not 34
        assert_eq!(grade_submission(&questions, &choices), (1, 33));
    }

    #[test]
    fn choice_outside_question_answers_is_incorrect() {
        let questions = vec![question_with_answers(1, 13)];
        // 21 is another question's answer id
        let choices = HashMap::from([(1, 21)]);
        assert_eq!(grade_submission(&questions, &choices), (0, 0));
    }

    #[test]
    fn take_submission_skips_garbage_fields() {
        let submitted = parse_take_submission(&pairs(&[
            ("question-1", "13"),
            ("question-x", "4"),
            ("question-2", "not-a-number"),
            ("unrelated", "3"),
        ]));
        assert_eq!(submitted, HashMap::from([(1, 13)]));
    }

    #[test]
    fn page_number_tolerates_garbage() {
        let query = FilterSortQuery {
            page: Some("junk".into()),
            ..FilterSortQuery::default()
        };
        assert_eq!(query.page_number(), 1);
    }
}
