//! Comment service
//!
//! Adding a comment needs an existing post. Editing and deleting need the
//! comment to live under the post named in the URL and to belong to the
//! acting user; a foreign comment is `PermissionDenied`, not `NotFound`.

use std::sync::Arc;

use anyhow::Context;

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithMeta, Page, PageRequest, User};

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Post or comment not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Acting user may not touch this comment; carries the user-facing message
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Which author-only action is being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Edit,
    Delete,
}

impl CommentAction {
    fn denied_message(self) -> &'static str {
        match self {
            Self::Edit => "Вы не авторизованы для редактирования этого комментария.",
            Self::Delete => "Вы не авторизованы для удаления этого комментария.",
        }
    }
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self { repo, post_repo }
    }

    /// Add a comment by `author` under `post_id`
    pub async fn create(
        &self,
        post_id: i64,
        author: &User,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        let text = validate_text(text)?;
        self.post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("post {}", post_id)))?;

        let comment = self
            .repo
            .create(post_id, author.id, text)
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, post_id, author_id = author.id, "Comment added");
        Ok(comment)
    }

    /// Comments under a post, oldest first
    pub async fn get_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>, CommentServiceError> {
        Ok(self
            .repo
            .get_by_post(post_id)
            .await
            .context("Failed to get comments")?)
    }

    /// Resolve a comment under `post_id` that `actor` is allowed to `action`
    pub async fn get_authorized(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &User,
        action: CommentAction,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self
            .repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))?;

        if !comment.is_authored_by(actor.id) {
            tracing::warn!(comment_id, user_id = actor.id, ?action, "Comment access denied");
            return Err(CommentServiceError::PermissionDenied(
                action.denied_message().to_string(),
            ));
        }
        Ok(comment)
    }

    /// Replace the text of `actor`'s comment
    pub async fn update(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &User,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        let mut comment = self
            .get_authorized(post_id, comment_id, actor, CommentAction::Edit)
            .await?;
        let text = validate_text(text)?;

        self.repo
            .update_text(comment_id, text)
            .await
            .context("Failed to update comment")?;

        comment.text = text.to_string();
        tracing::info!(comment_id, "Comment updated");
        Ok(comment)
    }

    /// Delete `actor`'s comment
    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &User,
    ) -> Result<(), CommentServiceError> {
        self.get_authorized(post_id, comment_id, actor, CommentAction::Delete)
            .await?;
        self.repo
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;

        tracing::info!(comment_id, "Comment deleted");
        Ok(())
    }

    /// All comments, newest first (back office)
    pub async fn list(&self, page: &PageRequest) -> Result<Page<CommentWithMeta>, CommentServiceError> {
        let total = self.count().await?;
        let items = self
            .repo
            .list(page.offset(total), page.limit())
            .await
            .context("Failed to list comments")?;
        Ok(Page::new(items, total, page))
    }

    pub async fn count(&self) -> Result<i64, CommentServiceError> {
        Ok(self.repo.count().await.context("Failed to count comments")?)
    }

    /// Delete any comment (back office)
    pub async fn admin_delete(&self, comment_id: i64) -> Result<(), CommentServiceError> {
        let deleted = self
            .repo
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;
        if !deleted {
            return Err(CommentServiceError::NotFound(format!("comment {}", comment_id)));
        }
        Ok(())
    }
}

fn validate_text(text: &str) -> Result<&str, CommentServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommentServiceError::ValidationError(
            "Комментарий не может быть пустым.".to_string(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CommentRepositoryImpl, SqlxPostRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::PostInput;
    use chrono::Utc;

    async fn setup() -> (CommentService, User, User, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let alice = users
            .create(&User::new("alice".into(), String::new(), "hash".into()))
            .await
            .unwrap();
        let bob = users
            .create(&User::new("bob".into(), String::new(), "hash".into()))
            .await
            .unwrap();

        let posts = SqlxPostRepository::boxed(pool.clone());
        let post = posts
            .create(
                alice.id,
                &PostInput {
                    title: "Post".into(),
                    text: "Body".into(),
                    pub_date: Utc::now(),
                    location_id: None,
                    category_id: None,
                    is_published: true,
                },
            )
            .await
            .unwrap();

        let service = CommentService::new(Arc::new(CommentRepositoryImpl::new(pool.clone())), posts);
        (service, alice, bob, post.id)
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (service, alice, _bob, post_id) = setup().await;

        let comment = service.create(post_id, &alice, "  Hello  ").await.unwrap();
        assert_eq!(comment.text, "Hello");
        assert_eq!(comment.author_id, alice.id);

        assert!(matches!(
            service.create(post_id, &alice, "   ").await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(9999, &alice, "orphan").await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_author_delete_is_denied_and_comment_survives() {
        let (service, alice, bob, post_id) = setup().await;
        let comment = service.create(post_id, &alice, "mine").await.unwrap();

        match service.delete(post_id, comment.id, &bob).await {
            Err(CommentServiceError::PermissionDenied(message)) => {
                assert_eq!(message, "Вы не авторизованы для удаления этого комментария.");
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }
        assert_eq!(service.get_by_post(post_id).await.unwrap().len(), 1);

        service.delete(post_id, comment.id, &alice).await.unwrap();
        assert!(service.get_by_post(post_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_author_edit_is_denied() {
        let (service, alice, bob, post_id) = setup().await;
        let comment = service.create(post_id, &alice, "original").await.unwrap();

        match service.update(post_id, comment.id, &bob, "hijacked").await {
            Err(CommentServiceError::PermissionDenied(message)) => {
                assert!(message.contains("редактирования"));
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }

        let updated = service.update(post_id, comment.id, &alice, "edited").await.unwrap();
        assert_eq!(updated.text, "edited");
        assert_eq!(service.get_by_post(post_id).await.unwrap()[0].comment.text, "edited");
    }

    #[tokio::test]
    async fn test_comment_under_wrong_post_is_not_found() {
        let (service, alice, _bob, post_id) = setup().await;
        let comment = service.create(post_id, &alice, "here").await.unwrap();

        assert!(matches!(
            service.get_authorized(post_id + 1, comment.id, &alice, CommentAction::Edit).await,
            Err(CommentServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(post_id, 9999, &alice).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_list_and_delete() {
        let (service, alice, bob, post_id) = setup().await;
        service.create(post_id, &alice, "one").await.unwrap();
        let two = service.create(post_id, &bob, "two").await.unwrap();

        let page = service.list(&PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].comment.text, "two");

        service.admin_delete(two.id).await.unwrap();
        assert_eq!(service.count().await.unwrap(), 1);
        assert!(matches!(
            service.admin_delete(two.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
