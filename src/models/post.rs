//! Post model
//!
//! Defines the Post entity, the display projection `PostWithMeta` used by
//! every listing, and the `PostFilter` the post repository turns into SQL.
//!
//! A post is publicly visible only when all three hold:
//! - its own `is_published` flag is set,
//! - `pub_date` is not in the future,
//! - its category, if it has one, is published.
//!
//! The same rule exists twice: as SQL in the repository (for listings) and as
//! [`Post::is_visible_at`] / [`PostWithMeta::is_visible_at`] (for single
//! records and tests). They must agree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// Post body
    pub text: String,
    /// Publication timestamp; future dates schedule the post
    pub pub_date: DateTime<Utc>,
    /// Author user ID
    pub author_id: i64,
    /// Optional location
    pub location_id: Option<i64>,
    /// Optional category
    pub category_id: Option<i64>,
    /// Hidden from the public when false
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Whether the post is publicly visible at `now`, given its category.
    pub fn is_visible_at(&self, now: DateTime<Utc>, category: Option<&Category>) -> bool {
        passes_visibility(
            self.is_published,
            self.pub_date,
            category.map(|c| c.is_published),
            now,
        )
    }

    /// Check if the given user wrote this post
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

fn passes_visibility(
    is_published: bool,
    pub_date: DateTime<Utc>,
    category_published: Option<bool>,
    now: DateTime<Utc>,
) -> bool {
    is_published && pub_date <= now && category_published.unwrap_or(true)
}

/// Post joined with author, category and location names plus the comment count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_is_published: Option<bool>,
    pub location_name: Option<String>,
    /// Number of comments, computed per query
    pub comment_count: i64,
}

impl PostWithMeta {
    /// Same rule as [`Post::is_visible_at`], using the joined category flag.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        passes_visibility(
            self.post.is_published,
            self.post.pub_date,
            self.category_is_published,
            now,
        )
    }
}

/// Whether a post query applies the public visibility rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only publicly visible posts
    #[default]
    Published,
    /// Everything, including drafts and scheduled posts (owner and admin views)
    Any,
}

/// Criteria for listing posts
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub visibility: Visibility,
    /// Case-insensitive substring match on the title (admin search)
    pub title_query: Option<String>,
    /// Exact match on the raw flag (admin filter)
    pub is_published: Option<bool>,
}

impl PostFilter {
    /// Publicly visible posts of every author
    pub fn published() -> Self {
        Self::default()
    }

    /// Every post, regardless of visibility
    pub fn all() -> Self {
        Self {
            visibility: Visibility::Any,
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_location(mut self, location_id: i64) -> Self {
        self.location_id = Some(location_id);
        self
    }
}

/// Input for creating or updating a post
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_published: bool,
}

/// Admin inline edit of a post row
#[derive(Debug, Clone)]
pub struct PostInlineUpdate {
    pub author_id: i64,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_published: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn post(is_published: bool, pub_date: DateTime<Utc>, category_id: Option<i64>) -> Post {
        Post {
            id: 1,
            title: "Title".into(),
            text: "Text".into(),
            pub_date,
            author_id: 1,
            location_id: None,
            category_id,
            is_published,
            created_at: pub_date,
        }
    }

    fn category(is_published: bool) -> Category {
        Category {
            id: 1,
            title: "Cat".into(),
            description: String::new(),
            slug: "cat".into(),
            is_published,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_visible_when_all_conditions_hold() {
        let now = Utc::now();
        let cat = category(true);
        assert!(post(true, now - Duration::hours(1), Some(1)).is_visible_at(now, Some(&cat)));
    }

    #[test]
    fn test_visible_without_category() {
        let now = Utc::now();
        assert!(post(true, now, None).is_visible_at(now, None));
    }

    #[test]
    fn test_hidden_when_unpublished_future_or_category_hidden() {
        let now = Utc::now();
        let published = category(true);
        let hidden = category(false);

        assert!(!post(false, now, Some(1)).is_visible_at(now, Some(&published)));
        assert!(!post(true, now + Duration::minutes(1), Some(1)).is_visible_at(now, Some(&published)));
        assert!(!post(true, now, Some(1)).is_visible_at(now, Some(&hidden)));
    }

    #[test]
    fn test_filter_builders() {
        let filter = PostFilter::published().with_author(3).with_category(4);
        assert_eq!(filter.visibility, Visibility::Published);
        assert_eq!(filter.author_id, Some(3));
        assert_eq!(filter.category_id, Some(4));
        assert_eq!(PostFilter::all().visibility, Visibility::Any);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Visibility is exactly the conjunction of the three conditions,
        /// and the joined projection agrees with the entity.
        #[test]
        fn property_visibility_is_conjunction(
            is_published in any::<bool>(),
            offset_minutes in -10_000i64..10_000,
            category_flag in proptest::option::of(any::<bool>()),
        ) {
            let now = Utc::now();
            let pub_date = now + Duration::minutes(offset_minutes);
            let p = post(is_published, pub_date, category_flag.map(|_| 1));
            let cat = category_flag.map(category);

            let expected = is_published && offset_minutes <= 0 && category_flag.unwrap_or(true);
            prop_assert_eq!(p.is_visible_at(now, cat.as_ref()), expected);

            let meta = PostWithMeta {
                post: p,
                author_username: "author".into(),
                category_title: cat.as_ref().map(|c| c.title.clone()),
                category_slug: cat.as_ref().map(|c| c.slug.clone()),
                category_is_published: category_flag,
                location_name: None,
                comment_count: 0,
            };
            prop_assert_eq!(meta.is_visible_at(now), expected);
        }
    }
}
