use std::{fs::create_dir_all, path::PathBuf};

use anyhow::Context;
use quizhub::db::{establish_connection, run_migrations};
use quizhub::server::app::run_server;
use quizhub::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenv::dotenv().ok();
    let path = dotenv::var("DB_PATH").expect("DB_PATH must be set");
    let pool = establish_connection(&path)
        .await
        .context("Cannot connect to DB")?;
    let static_dir =
        PathBuf::from(dotenv::var("STATIC_DIR").expect("Variable STATIC_DIR should be set"));
    if !static_dir.exists() {
        create_dir_all(&static_dir).context("Failed to create directory for static content")?;
    }
    if !static_dir.is_dir() {
        anyhow::bail!("Variable STATIC_DIR should be a directory or not exist");
    }
    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    tracing::info!("Running db migrations...");
    run_migrations(&pool).await?;

    run_server(pool, static_dir, &addr).await
}
