use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::db::queries::categories::{self, get_all_categories};
use crate::db::Category;
use crate::forms::{FormErrors, REQUIRED_ERROR, SAME_CATEGORY_TITLE_ERROR};
use crate::server::app::AppState;
use crate::text::slugify;

use super::ApiResponse;

#[derive(Debug, Default, Clone, Deserialize)]
struct NewCategory {
    #[serde(default)]
    title: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "categories/categories.html", escape = "none")]
struct CategoriesPage {
    categories: Vec<Category>,
    errors: FormErrors,
}

async fn categories_page(State(pool): State<SqlitePool>) -> ApiResponse<CategoriesPage> {
    Ok(CategoriesPage {
        categories: get_all_categories(&pool).await?,
        errors: FormErrors::default(),
    })
}

async fn create_category(
    State(pool): State<SqlitePool>,
    Form(form): Form<NewCategory>,
) -> ApiResponse<Response> {
    let title = form.title.trim();
    let mut errors = FormErrors::default();
    if title.is_empty() {
        errors.add_field("title", REQUIRED_ERROR);
    } else if categories::category_title_taken(&pool, title).await? {
        errors.add_field("title", SAME_CATEGORY_TITLE_ERROR);
    }
    if !errors.is_empty() {
        return Ok(CategoriesPage {
            categories: get_all_categories(&pool).await?,
            errors,
        }
        .into_response());
    }
    categories::create_category(&pool, title, &slugify(title)).await?;
    Ok(Redirect::to("/categories").into_response())
}

pub fn categories_router(state: AppState) -> Router {
    Router::new()
        .route("/categories", get(categories_page).post(create_category))
        .with_state(state)
}
