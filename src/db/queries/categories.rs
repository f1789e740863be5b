use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

pub async fn get_all_categories(pool: &SqlitePool) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn category_title_taken(pool: &SqlitePool, title: &str) -> sqlx::Result<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories WHERE title = ?1")
        .bind(title)
        .fetch_one(pool)
        .await?;
    Ok(count.0 > 0)
}

pub async fn create_category(pool: &SqlitePool, title: &str, slug: &str) -> sqlx::Result<i64> {
    let id = sqlx::query("INSERT INTO categories (title, slug) VALUES (?1, ?2)")
        .bind(title)
        .bind(slug)
        .execute(pool)
        .await?
        .last_insert_rowid();
    Ok(id)
}

/// Deleting a category leaves its quizzes in place with a nulled
/// category reference (enforced by the schema's ON DELETE SET NULL).
pub async fn delete_category(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Reconciles the catalog with an imported list: categories missing from
/// the import are deleted, known ones are updated, new ones created.
pub async fn import_categories(pool: &SqlitePool, categories: Vec<Category>) -> sqlx::Result<()> {
    let existing = get_all_categories(pool).await?;
    let existing_ids: HashSet<i64> = existing.iter().map(|c| c.id).collect();
    let imported_ids: HashSet<i64> = categories.iter().map(|c| c.id).collect();
    for id in existing_ids.difference(&imported_ids) {
        delete_category(pool, *id).await?;
    }
    for category in categories {
        if existing_ids.contains(&category.id) {
            sqlx::query("UPDATE categories SET title = ?1, slug = ?2 WHERE id = ?3")
                .bind(&category.title)
                .bind(&category.slug)
                .bind(category.id)
                .execute(pool)
                .await?;
        } else {
            sqlx::query("INSERT INTO categories (id, title, slug) VALUES (?1, ?2, ?3)")
                .bind(category.id)
                .bind(&category.title)
                .bind(&category.slug)
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}
