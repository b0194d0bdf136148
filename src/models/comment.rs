//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::gravatar_url;

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Check if the given user wrote this comment
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

/// Comment with author and post info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithMeta {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub avatar_url: String,
    pub post_title: String,
}

impl CommentWithMeta {
    pub fn new(comment: Comment, author_username: String, author_email: &str, post_title: String) -> Self {
        Self {
            comment,
            author_username,
            avatar_url: gravatar_url(author_email),
            post_title,
        }
    }
}
