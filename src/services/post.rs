//! Post service
//!
//! Business rules for posts:
//! - public listings (index, category, profile) apply the visibility rule,
//!   except for an author looking at their own profile
//! - the detail view shows an author their own post unconditionally
//! - only the author may edit; anyone else gets `NotAuthor`
//! - deletion looks the post up among the actor's own posts, so a non-author
//!   gets `NotFound`
//! - back-office operations skip authorship checks
//!
//! The acting identity is always passed in explicitly.

use crate::db::repositories::{CategoryRepository, LocationRepository, PostRepository};
use crate::models::{
    Category, Page, PageRequest, Post, PostFilter, PostInlineUpdate, PostInput, PostWithMeta, User,
};
use anyhow::Context;
use std::sync::Arc;

/// Maximum title length
pub const TITLE_MAX_LEN: usize = 256;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post (or category) not found, or not visible to the requester
    #[error("Not found: {0}")]
    NotFound(String),

    /// Acting user is not the post's author
    #[error("User {user_id:?} is not the author of post {post_id}")]
    NotAuthor { post_id: i64, user_id: Option<i64> },

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    location_repo: Arc<dyn LocationRepository>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        location_repo: Arc<dyn LocationRepository>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            location_repo,
        }
    }

    // ========================================================================
    // Public reads
    // ========================================================================

    /// Index page: every publicly visible post
    pub async fn list_published(
        &self,
        page: &PageRequest,
    ) -> Result<Page<PostWithMeta>, PostServiceError> {
        Ok(self
            .repo
            .list(&PostFilter::published(), page)
            .await
            .context("Failed to list posts")?)
    }

    /// Category page. An unknown or unpublished category is not found.
    pub async fn list_by_category(
        &self,
        slug: &str,
        page: &PageRequest,
    ) -> Result<(Category, Page<PostWithMeta>), PostServiceError> {
        let category = self
            .category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .filter(|c| c.is_published)
            .ok_or_else(|| PostServiceError::NotFound(format!("category '{}'", slug)))?;

        let posts = self
            .repo
            .list(&PostFilter::published().with_category(category.id), page)
            .await
            .context("Failed to list category posts")?;

        Ok((category, posts))
    }

    /// Profile page: the owner sees everything they wrote, others see only
    /// what is publicly visible.
    pub async fn list_by_author(
        &self,
        profile: &User,
        viewer: Option<&User>,
        page: &PageRequest,
    ) -> Result<Page<PostWithMeta>, PostServiceError> {
        let is_owner = viewer.map(|v| v.id) == Some(profile.id);
        let base = if is_owner {
            PostFilter::all()
        } else {
            PostFilter::published()
        };
        let filter = base.with_author(profile.id);

        Ok(self
            .repo
            .list(&filter, page)
            .await
            .context("Failed to list author posts")?)
    }

    /// Post detail: the author always sees their post, anyone else only a
    /// publicly visible one.
    pub async fn get_detail(
        &self,
        id: i64,
        viewer: Option<&User>,
    ) -> Result<PostWithMeta, PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))?;

        let filter = match viewer {
            Some(user) if post.is_authored_by(user.id) => PostFilter::all(),
            _ => PostFilter::published(),
        };

        self.repo
            .find_one(id, &filter)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))
    }

    /// Get a post by ID with no visibility check
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, PostServiceError> {
        Ok(self.repo.get_by_id(id).await.context("Failed to get post")?)
    }

    // ========================================================================
    // Author operations
    // ========================================================================

    /// Create a post authored by `author`
    pub async fn create(&self, author: &User, input: PostInput) -> Result<Post, PostServiceError> {
        self.validate(&input).await?;

        let post = self
            .repo
            .create(author.id, &input)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = post.id, author_id = author.id, "Post created");
        Ok(post)
    }

    /// Load a post for editing by `actor`.
    ///
    /// `NotAuthor` covers both the anonymous case and someone else's post.
    pub async fn get_for_edit(&self, id: i64, actor: Option<&User>) -> Result<Post, PostServiceError> {
        let post = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))?;

        match actor {
            Some(user) if post.is_authored_by(user.id) => Ok(post),
            _ => Err(PostServiceError::NotAuthor {
                post_id: id,
                user_id: actor.map(|u| u.id),
            }),
        }
    }

    /// Update a post; only its author may do so
    pub async fn update(
        &self,
        id: i64,
        actor: &User,
        input: PostInput,
    ) -> Result<Post, PostServiceError> {
        self.get_for_edit(id, Some(actor)).await?;
        self.validate(&input).await?;

        let post = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update post")?;

        tracing::info!(post_id = id, "Post updated");
        Ok(post)
    }

    /// Look a post up among `actor`'s own posts
    pub async fn get_own(&self, id: i64, actor: &User) -> Result<PostWithMeta, PostServiceError> {
        self.repo
            .find_one(id, &PostFilter::all().with_author(actor.id))
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))
    }

    /// Delete one of `actor`'s own posts
    pub async fn delete(&self, id: i64, actor: &User) -> Result<(), PostServiceError> {
        self.get_own(id, actor).await?;
        self.repo.delete(id).await.context("Failed to delete post")?;

        tracing::info!(post_id = id, author_id = actor.id, "Post deleted");
        Ok(())
    }

    // ========================================================================
    // Back office
    // ========================================================================

    /// List posts with an arbitrary filter
    pub async fn list(
        &self,
        filter: &PostFilter,
        page: &PageRequest,
    ) -> Result<Page<PostWithMeta>, PostServiceError> {
        Ok(self.repo.list(filter, page).await.context("Failed to list posts")?)
    }

    /// Count posts matching a filter
    pub async fn count(&self, filter: &PostFilter) -> Result<i64, PostServiceError> {
        Ok(self.repo.count(filter).await.context("Failed to count posts")?)
    }

    /// Replace a post's fields without an authorship check
    pub async fn admin_update(&self, id: i64, input: PostInput) -> Result<Post, PostServiceError> {
        self.require(id).await?;
        self.validate(&input).await?;
        Ok(self.repo.update(id, &input).await.context("Failed to update post")?)
    }

    /// Inline edit from the back-office list
    pub async fn admin_update_inline(
        &self,
        id: i64,
        input: PostInlineUpdate,
    ) -> Result<Post, PostServiceError> {
        self.require(id).await?;
        self.check_references(input.category_id, input.location_id).await?;
        Ok(self
            .repo
            .update_inline(id, &input)
            .await
            .context("Failed to update post")?)
    }

    /// Delete any post
    pub async fn admin_delete(&self, id: i64) -> Result<(), PostServiceError> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete post")?;
        tracing::info!(post_id = id, "Post deleted from back office");
        Ok(())
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    async fn require(&self, id: i64) -> Result<Post, PostServiceError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))
    }

    async fn validate(&self, input: &PostInput) -> Result<(), PostServiceError> {
        if input.title.trim().is_empty() {
            return Err(PostServiceError::ValidationError("Заголовок обязателен.".into()));
        }
        if input.title.chars().count() > TITLE_MAX_LEN {
            return Err(PostServiceError::ValidationError(format!(
                "Заголовок не может быть длиннее {} символов.",
                TITLE_MAX_LEN
            )));
        }
        if input.text.trim().is_empty() {
            return Err(PostServiceError::ValidationError("Текст обязателен.".into()));
        }
        self.check_references(input.category_id, input.location_id).await
    }

    async fn check_references(
        &self,
        category_id: Option<i64>,
        location_id: Option<i64>,
    ) -> Result<(), PostServiceError> {
        if let Some(id) = category_id {
            if self
                .category_repo
                .get_by_id(id)
                .await
                .context("Failed to get category")?
                .is_none()
            {
                return Err(PostServiceError::ValidationError(
                    "Выбранная категория не существует.".into(),
                ));
            }
        }
        if let Some(id) = location_id {
            if self
                .location_repo
                .get_by_id(id)
                .await
                .context("Failed to get location")?
                .is_none()
            {
                return Err(PostServiceError::ValidationError(
                    "Выбранное местоположение не существует.".into(),
                ));
            }
        }
        Ok(())
    }
}
