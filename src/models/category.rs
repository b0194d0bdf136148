//! Category model
//!
//! A thematic grouping of posts, addressed by a unique slug. Unpublishing a
//! category hides every post in it from public listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Category title
    pub title: String,
    /// Category description
    pub description: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Hidden from the public when false
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a category
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

/// Check that a slug only contains latin letters, digits, hyphens and underscores
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
