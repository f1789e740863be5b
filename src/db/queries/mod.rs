pub mod categories;
pub mod questions;
pub mod quizzes;
pub mod scores;
pub mod sessions;
pub mod users;
