use askama::Template;
use askama_web::WebTemplate;
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::{extract::FromRef, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::routes::{accounts_router, categories_router, quizzes_router};

#[derive(FromRef, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub static_dir: PathBuf,
}

pub async fn run_server(pool: SqlitePool, static_dir: PathBuf, addr: &str) -> anyhow::Result<()> {
    let state = AppState {
        pool,
        static_dir: static_dir.clone(),
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(accounts_router(state.clone()))
        .merge(quizzes_router(state.clone()))
        .merge(categories_router(state.clone()))
        .fallback(|| async {
            tracing::info!("Fallback");
            StatusCode::NOT_FOUND
        })
        .layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Serving on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> IndexPage {
    IndexPage {}
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html", escape = "none")]
struct IndexPage;

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = vec![];
    encoder.encode(&metrics, &mut buf).unwrap();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buf))
        .unwrap()
}
