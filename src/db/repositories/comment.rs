//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithMeta};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments under a post, oldest first
    async fn get_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>>;

    /// All comments, newest first (back office)
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<CommentWithMeta>>;

    /// Count all comments
    async fn count(&self) -> Result<i64>;

    /// Replace the text of a comment
    async fn update_text(&self, id: i64, text: &str) -> Result<bool>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Comment repository implementation
pub struct CommentRepositoryImpl {
    pool: DynDatabasePool,
}

impl CommentRepositoryImpl {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for CommentRepositoryImpl {
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        create_sqlite(self.pool.sqlite(), post_id, author_id, text).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        get_by_id_sqlite(self.pool.sqlite(), id).await
    }

    async fn get_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>> {
        let sql = format!(
            "{} WHERE cm.post_id = ? ORDER BY cm.created_at ASC, cm.id ASC",
            COMMENT_WITH_META_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to get comments for post")?;

        rows.iter().map(row_to_comment_with_meta).collect()
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<CommentWithMeta>> {
        let sql = format!(
            "{} ORDER BY cm.created_at DESC, cm.id DESC LIMIT ? OFFSET ?",
            COMMENT_WITH_META_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list comments")?;

        rows.iter().map(row_to_comment_with_meta).collect()
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM comments")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count comments")?;
        Ok(row.get("count"))
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update comment")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete comment")?;
        Ok(result.rows_affected() > 0)
    }
}

// SQLite implementations

const COMMENT_WITH_META_SELECT: &str = r#"
    SELECT cm.id, cm.text, cm.post_id, cm.author_id, cm.created_at,
           u.username AS author_username, u.email AS author_email,
           p.title AS post_title
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
    JOIN posts p ON p.id = cm.post_id
"#;

async fn create_sqlite(pool: &SqlitePool, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(text)
    .bind(post_id)
    .bind(author_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        text: text.to_string(),
        post_id,
        author_id,
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    row.map(|row| row_to_comment(&row)).transpose()
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        post_id: row.try_get("post_id")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_comment_with_meta(row: &sqlx::sqlite::SqliteRow) -> Result<CommentWithMeta> {
    let email: String = row.try_get("author_email")?;
    Ok(CommentWithMeta::new(
        row_to_comment(row)?,
        row.try_get("author_username")?,
        &email,
        row.try_get("post_title")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, CommentRepositoryImpl, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, date_joined) VALUES ('alice', 'alice@example.com', 'hash', ?)",
        )
        .bind(Utc::now())
        .execute(pool.sqlite())
        .await
        .unwrap()
        .last_insert_rowid();

        let post_id = sqlx::query(
            "INSERT INTO posts (title, text, pub_date, author_id, created_at) VALUES ('Post', 'text', ?, ?, ?)",
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(Utc::now())
        .execute(pool.sqlite())
        .await
        .unwrap()
        .last_insert_rowid();

        let repo = CommentRepositoryImpl::new(pool.clone());
        (pool, repo, user_id, post_id)
    }

    #[tokio::test]
    async fn test_create_and_get_comment() {
        let (_pool, repo, user_id, post_id) = setup().await;

        let comment = repo.create(post_id, user_id, "Nice post").await.unwrap();
        let found = repo.get_by_id(comment.id).await.unwrap().unwrap();

        assert_eq!(found.text, "Nice post");
        assert_eq!(found.post_id, post_id);
        assert!(found.is_authored_by(user_id));
    }

    #[tokio::test]
    async fn test_comment_requires_existing_post() {
        let (_pool, repo, user_id, _post_id) = setup().await;
        assert!(repo.create(9999, user_id, "orphan").await.is_err());
    }

    #[tokio::test]
    async fn test_get_by_post_oldest_first() {
        let (_pool, repo, user_id, post_id) = setup().await;
        for text in ["first", "second", "third"] {
            repo.create(post_id, user_id, text).await.unwrap();
        }

        let comments = repo.get_by_post(post_id).await.unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(comments[0].author_username, "alice");
        assert_eq!(comments[0].post_title, "Post");
        assert!(comments[0].avatar_url.contains("gravatar.com/avatar/"));
    }

    #[tokio::test]
    async fn test_update_and_delete_comment() {
        let (_pool, repo, user_id, post_id) = setup().await;
        let comment = repo.create(post_id, user_id, "typo").await.unwrap();

        assert!(repo.update_text(comment.id, "fixed").await.unwrap());
        assert_eq!(repo.get_by_id(comment.id).await.unwrap().unwrap().text, "fixed");

        assert!(repo.delete(comment.id).await.unwrap());
        assert!(!repo.delete(comment.id).await.unwrap());
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let (_pool, repo, user_id, post_id) = setup().await;
        for text in ["a", "b", "c"] {
            repo.create(post_id, user_id, text).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 3);
        let newest = repo.list(0, 2).await.unwrap();
        let texts: Vec<&str> = newest.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "b"]);
    }
}
