//! Category service
//!
//! Category management for the back office:
//! - create, update, delete
//! - title and slug validation
//! - slug uniqueness
//!
//! Deleting a category keeps its posts; their category reference becomes null.

use crate::db::repositories::CategoryRepository;
use crate::models::{is_valid_slug, Category, CategoryInput};
use anyhow::Context;
use std::sync::Arc;

/// Maximum title length
pub const CATEGORY_TITLE_MAX_LEN: usize = 256;

/// Maximum slug length
pub const SLUG_MAX_LEN: usize = 64;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category slug already exists
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `ValidationError` for an empty title or malformed slug
    /// - `DuplicateSlug` if the slug is already used
    pub async fn create(&self, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        let input = normalize(input);
        validate(&input)?;

        if self.get_by_slug(&input.slug).await?.is_some() {
            return Err(CategoryServiceError::DuplicateSlug(input.slug));
        }

        let category = self
            .repo
            .create(&input)
            .await
            .context("Failed to create category")?;

        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Update an existing category
    pub async fn update(&self, id: i64, input: CategoryInput) -> Result<Category, CategoryServiceError> {
        let input = normalize(input);
        validate(&input)?;
        self.require(id).await?;

        if let Some(existing) = self.get_by_slug(&input.slug).await? {
            if existing.id != id {
                return Err(CategoryServiceError::DuplicateSlug(input.slug));
            }
        }

        let category = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update category")?;

        tracing::info!(category_id = id, "Category updated");
        Ok(category)
    }

    /// Delete a category
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete category")?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        Ok(self.repo.get_by_id(id).await.context("Failed to get category")?)
    }

    /// Get category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, CategoryServiceError> {
        Ok(self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?)
    }

    /// All categories ordered by title
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    pub async fn count(&self) -> Result<i64, CategoryServiceError> {
        Ok(self.repo.count().await.context("Failed to count categories")?)
    }

    async fn require(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }
}

fn normalize(mut input: CategoryInput) -> CategoryInput {
    input.title = input.title.trim().to_string();
    input.slug = input.slug.trim().to_string();
    input.description = input.description.trim().to_string();
    input
}

fn validate(input: &CategoryInput) -> Result<(), CategoryServiceError> {
    if input.title.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Заголовок обязателен.".to_string(),
        ));
    }
    if input.title.chars().count() > CATEGORY_TITLE_MAX_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Заголовок не может быть длиннее {} символов.",
            CATEGORY_TITLE_MAX_LEN
        )));
    }
    if input.slug.len() > SLUG_MAX_LEN || !is_valid_slug(&input.slug) {
        return Err(CategoryServiceError::ValidationError(
            "Идентификатор страницы для URL; разрешены символы латиницы, цифры, дефис и подчёркивание."
                .to_string(),
        ));
    }
    Ok(())
}
