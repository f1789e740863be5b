pub mod queries;

use sqlx::sqlite::SqlitePool;
use sqlx::Error;

pub use queries::categories::Category;
pub use queries::questions::{Answer, Question};
pub use queries::quizzes::Quiz;
pub use queries::scores::Score;
pub use queries::users::{Profile, User};

pub async fn establish_connection(path: &str) -> Result<SqlitePool, Error> {
    SqlitePool::connect(format!("sqlite:{}", path).as_str()).await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
