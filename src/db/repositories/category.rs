//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait on SQLite

use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// Update a category
    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category>;

    /// Delete a category; its posts keep existing without a category
    async fn delete(&self, id: i64) -> Result<()>;

    /// List all categories ordered by title
    async fn list(&self) -> Result<Vec<Category>>;

    /// Count total categories
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CategoryInput) -> Result<Category> {
        create_category_sqlite(self.pool.sqlite(), input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        get_category_by_id_sqlite(self.pool.sqlite(), id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, slug, is_published, created_at
            FROM categories
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get category by slug")?;

        row.map(|row| row_to_category_sqlite(&row)).transpose()
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category> {
        update_category_sqlite(self.pool.sqlite(), id, input).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete category")?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, slug, is_published, created_at
            FROM categories
            ORDER BY title, id
            "#,
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list categories")?;

        rows.iter().map(row_to_category_sqlite).collect()
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM categories")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count categories")?;
        Ok(row.get("count"))
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, input: &CategoryInput) -> Result<Category> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, description, slug, is_published, created_at
        FROM categories
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    row.map(|row| row_to_category_sqlite(&row)).transpose()
}

async fn update_category_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &CategoryInput,
) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE categories
        SET title = ?, description = ?, slug = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        slug: row.try_get("slug")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    fn input(title: &str, slug: &str) -> CategoryInput {
        CategoryInput {
            title: title.to_string(),
            description: format!("About {}", title),
            slug: slug.to_string(),
            is_published: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let repo = setup_test_repo().await;

        let created = repo.create(&input("Travel", "travel")).await.unwrap();
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.title, "Travel");
        assert_eq!(by_id.description, "About Travel");

        let by_slug = repo.get_by_slug("travel").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);

        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_fails() {
        let repo = setup_test_repo().await;
        repo.create(&input("Travel", "travel")).await.unwrap();
        assert!(repo.create(&input("Other", "travel")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_category() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("Travel", "travel")).await.unwrap();

        let mut changed = input("Trips", "trips");
        changed.is_published = false;
        let updated = repo.update(created.id, &changed).await.unwrap();

        assert_eq!(updated.title, "Trips");
        assert_eq!(updated.slug, "trips");
        assert!(!updated.is_published);
    }

    #[tokio::test]
    async fn test_list_count_delete() {
        let repo = setup_test_repo().await;
        let b = repo.create(&input("B", "b")).await.unwrap();
        repo.create(&input("A", "a")).await.unwrap();

        let titles: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(repo.count().await.unwrap(), 2);

        repo.delete(b.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
