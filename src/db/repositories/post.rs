//! Post repository
//!
//! Database operations for posts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait on SQLite
//!
//! Every listing goes through one query shape: posts joined with author,
//! category and location, annotated with a correlated comment count, filtered
//! by a [`PostFilter`] and ordered newest `pub_date` first. The public
//! visibility rule is applied in SQL so pagination counts only what the
//! viewer may see.

use crate::db::DynDatabasePool;
use crate::models::{
    Page, PageRequest, Post, PostFilter, PostInlineUpdate, PostInput, PostWithMeta, Visibility,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post for `author_id`
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post>;

    /// Get a post by ID, ignoring visibility
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a post by ID with joined data if it passes `filter`
    async fn find_one(&self, id: i64, filter: &PostFilter) -> Result<Option<PostWithMeta>>;

    /// Count posts matching `filter`
    async fn count(&self, filter: &PostFilter) -> Result<i64>;

    /// One page of posts matching `filter`, newest first
    async fn list(&self, filter: &PostFilter, page: &PageRequest) -> Result<Page<PostWithMeta>>;

    /// Replace the editable fields of a post
    async fn update(&self, id: i64, input: &PostInput) -> Result<Post>;

    /// Change author, location, category and published flag (admin list edit)
    async fn update_inline(&self, id: i64, input: &PostInlineUpdate) -> Result<Post>;

    /// Delete a post and, by cascade, its comments
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        create_post_sqlite(self.pool.sqlite(), author_id, input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        get_post_by_id_sqlite(self.pool.sqlite(), id).await
    }

    async fn find_one(&self, id: i64, filter: &PostFilter) -> Result<Option<PostWithMeta>> {
        find_post_sqlite(self.pool.sqlite(), id, filter, Utc::now()).await
    }

    async fn count(&self, filter: &PostFilter) -> Result<i64> {
        count_posts_sqlite(self.pool.sqlite(), filter, Utc::now()).await
    }

    async fn list(&self, filter: &PostFilter, page: &PageRequest) -> Result<Page<PostWithMeta>> {
        let pool = self.pool.sqlite();
        let now = Utc::now();

        let total = count_posts_sqlite(pool, filter, now).await?;
        let items = list_posts_sqlite(pool, filter, now, page.offset(total), page.limit()).await?;

        Ok(Page::new(items, total, page))
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<Post> {
        update_post_sqlite(self.pool.sqlite(), id, input).await
    }

    async fn update_inline(&self, id: i64, input: &PostInlineUpdate) -> Result<Post> {
        let pool = self.pool.sqlite();
        sqlx::query(
            r#"
            UPDATE posts
            SET author_id = ?, location_id = ?, category_id = ?, is_published = ?
            WHERE id = ?
            "#,
        )
        .bind(input.author_id)
        .bind(input.location_id)
        .bind(input.category_id)
        .bind(input.is_published)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

        get_post_by_id_sqlite(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete post")?;
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

const POST_COLUMNS: &str = "id, title, text, pub_date, author_id, location_id, category_id, is_published, created_at";

const POST_WITH_META_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.author_id, p.location_id, p.category_id,
           p.is_published, p.created_at,
           u.username AS author_username,
           c.title AS category_title,
           c.slug AS category_slug,
           c.is_published AS category_is_published,
           l.name AS location_name,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

/// Append the WHERE clause for `filter`. Posts are aliased `p`, categories `c`.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PostFilter, now: DateTime<Utc>) {
    qb.push(" WHERE 1 = 1");

    if filter.visibility == Visibility::Published {
        qb.push(" AND p.is_published = 1 AND p.pub_date <= ");
        qb.push_bind(now);
        qb.push(" AND (p.category_id IS NULL OR c.is_published = 1)");
    }
    if let Some(author_id) = filter.author_id {
        qb.push(" AND p.author_id = ").push_bind(author_id);
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(location_id) = filter.location_id {
        qb.push(" AND p.location_id = ").push_bind(location_id);
    }
    if let Some(is_published) = filter.is_published {
        qb.push(" AND p.is_published = ").push_bind(is_published);
    }
    if let Some(query) = filter.title_query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        qb.push(" AND p.title LIKE ").push_bind(format!("%{}%", query));
    }
}

async fn create_post_sqlite(pool: &SqlitePool, author_id: i64, input: &PostInput) -> Result<Post> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        text: input.text.clone(),
        pub_date: input.pub_date,
        author_id,
        location_id: input.location_id,
        category_id: input.category_id,
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.map(|row| row_to_post_sqlite(&row)).transpose()
}

async fn find_post_sqlite(
    pool: &SqlitePool,
    id: i64,
    filter: &PostFilter,
    now: DateTime<Utc>,
) -> Result<Option<PostWithMeta>> {
    let mut qb = QueryBuilder::<Sqlite>::new(POST_WITH_META_SELECT);
    push_filter(&mut qb, filter, now);
    qb.push(" AND p.id = ").push_bind(id);

    let row = qb
        .build()
        .fetch_optional(pool)
        .await
        .context("Failed to find post")?;

    row.map(|row| row_to_post_with_meta_sqlite(&row)).transpose()
}

async fn count_posts_sqlite(pool: &SqlitePool, filter: &PostFilter, now: DateTime<Utc>) -> Result<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) AS count FROM posts p LEFT JOIN categories c ON c.id = p.category_id",
    );
    push_filter(&mut qb, filter, now);

    let row = qb
        .build()
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    Ok(row.get("count"))
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    filter: &PostFilter,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<PostWithMeta>> {
    let mut qb = QueryBuilder::<Sqlite>::new(POST_WITH_META_SELECT);
    push_filter(&mut qb, filter, now);
    qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_with_meta_sqlite).collect()
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, input: &PostInput) -> Result<Post> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, is_published = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        author_id: row.try_get("author_id")?,
        location_id: row.try_get("location_id")?,
        category_id: row.try_get("category_id")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_post_with_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithMeta> {
    Ok(PostWithMeta {
        post: row_to_post_sqlite(row)?,
        author_username: row.try_get("author_username")?,
        category_title: row.try_get("category_title")?,
        category_slug: row.try_get("category_slug")?,
        category_is_published: row.try_get("category_is_published")?,
        location_name: row.try_get("location_name")?,
        comment_count: row.try_get("comment_count")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use proptest::prelude::*;

    async fn setup() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_user(pool: &DynDatabasePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, password_hash, date_joined) VALUES (?, ?, ?)")
            .bind(username)
            .bind("hash")
            .bind(Utc::now())
            .execute(pool.sqlite())
            .await
            .expect("Failed to create user")
            .last_insert_rowid()
    }

    async fn create_category(pool: &DynDatabasePool, slug: &str, is_published: bool) -> i64 {
        sqlx::query(
            "INSERT INTO categories (title, slug, is_published, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(slug.to_uppercase())
        .bind(slug)
        .bind(is_published)
        .bind(Utc::now())
        .execute(pool.sqlite())
        .await
        .expect("Failed to create category")
        .last_insert_rowid()
    }

    async fn add_comment(pool: &DynDatabasePool, post_id: i64, author_id: i64) {
        sqlx::query("INSERT INTO comments (text, post_id, author_id, created_at) VALUES ('hi', ?, ?, ?)")
            .bind(post_id)
            .bind(author_id)
            .bind(Utc::now())
            .execute(pool.sqlite())
            .await
            .expect("Failed to add comment");
    }

    fn input(title: &str, pub_date: DateTime<Utc>, category_id: Option<i64>) -> PostInput {
        PostInput {
            title: title.to_string(),
            text: format!("{} text", title),
            pub_date,
            location_id: None,
            category_id,
            is_published: true,
        }
    }

    fn titles(page: &Page<PostWithMeta>) -> Vec<String> {
        page.items.iter().map(|p| p.post.title.clone()).collect()
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;

        let created = repo
            .create(author, &input("First", Utc::now(), None))
            .await
            .expect("Failed to create post");
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "First");
        assert_eq!(found.author_id, author);
        assert!(found.is_published);
    }

    #[tokio::test]
    async fn test_public_listing_applies_visibility_rule() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;
        let open = create_category(&pool, "open", true).await;
        let closed = create_category(&pool, "closed", false).await;
        let past = Utc::now() - Duration::hours(1);

        repo.create(author, &input("visible", past, Some(open))).await.unwrap();
        repo.create(author, &input("no-category", past, None)).await.unwrap();
        repo.create(author, &input("future", Utc::now() + Duration::days(1), Some(open)))
            .await
            .unwrap();
        repo.create(author, &input("hidden-category", past, Some(closed)))
            .await
            .unwrap();
        let mut draft = input("draft", past, Some(open));
        draft.is_published = false;
        repo.create(author, &draft).await.unwrap();

        let public = repo
            .list(&PostFilter::published(), &PageRequest::default())
            .await
            .unwrap();
        let mut visible = titles(&public);
        visible.sort();
        assert_eq!(visible, vec!["no-category", "visible"]);
        assert_eq!(public.total, 2);

        let own = repo
            .list(&PostFilter::all().with_author(author), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(own.total, 5);
    }

    #[tokio::test]
    async fn test_find_one_respects_filter() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;
        let mut draft = input("draft", Utc::now(), None);
        draft.is_published = false;
        let post = repo.create(author, &draft).await.unwrap();

        assert!(repo.find_one(post.id, &PostFilter::published()).await.unwrap().is_none());
        let found = repo.find_one(post.id, &PostFilter::all()).await.unwrap().unwrap();
        assert_eq!(found.author_username, "alice");
        assert!(repo.find_one(9999, &PostFilter::all()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comment_count_annotation() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;
        let past = Utc::now() - Duration::minutes(5);
        let a = repo.create(author, &input("a", past, None)).await.unwrap();
        let b = repo.create(author, &input("b", past - Duration::minutes(1), None)).await.unwrap();

        for _ in 0..3 {
            add_comment(&pool, a.id, author).await;
        }

        let page = repo.list(&PostFilter::published(), &PageRequest::default()).await.unwrap();
        let counts: Vec<(i64, i64)> = page.items.iter().map(|p| (p.post.id, p.comment_count)).collect();
        assert_eq!(counts, vec![(a.id, 3), (b.id, 0)]);
    }

    #[tokio::test]
    async fn test_category_and_location_names_joined() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;
        let category = create_category(&pool, "travel", true).await;
        let location = sqlx::query("INSERT INTO locations (name, created_at) VALUES ('Сочи', ?)")
            .bind(Utc::now())
            .execute(pool.sqlite())
            .await
            .unwrap()
            .last_insert_rowid();

        let mut data = input("trip", Utc::now(), Some(category));
        data.location_id = Some(location);
        let post = repo.create(author, &data).await.unwrap();

        let meta = repo.find_one(post.id, &PostFilter::all()).await.unwrap().unwrap();
        assert_eq!(meta.category_slug.as_deref(), Some("travel"));
        assert_eq!(meta.category_is_published, Some(true));
        assert_eq!(meta.location_name.as_deref(), Some("Сочи"));
    }

    #[tokio::test]
    async fn test_admin_title_search_and_flag_filter() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;
        repo.create(author, &input("Rust tips", Utc::now(), None)).await.unwrap();
        let mut draft = input("rusty draft", Utc::now(), None);
        draft.is_published = false;
        repo.create(author, &draft).await.unwrap();
        repo.create(author, &input("Gardening", Utc::now(), None)).await.unwrap();

        let filter = PostFilter {
            title_query: Some("rust".into()),
            ..PostFilter::all()
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 2);

        let filter = PostFilter {
            title_query: Some("rust".into()),
            is_published: Some(false),
            ..PostFilter::all()
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_inline_update() {
        let (pool, repo) = setup().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let category = create_category(&pool, "travel", true).await;
        let post = repo.create(alice, &input("old", Utc::now(), None)).await.unwrap();

        let mut changed = input("new", Utc::now() - Duration::days(1), Some(category));
        changed.is_published = false;
        let updated = repo.update(post.id, &changed).await.unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.category_id, Some(category));
        assert!(!updated.is_published);
        assert_eq!(updated.author_id, alice);

        let inline = repo
            .update_inline(
                post.id,
                &PostInlineUpdate {
                    author_id: bob,
                    location_id: None,
                    category_id: None,
                    is_published: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(inline.author_id, bob);
        assert_eq!(inline.category_id, None);
        assert!(inline.is_published);
        assert_eq!(inline.title, "new");
    }

    #[tokio::test]
    async fn test_delete_post_removes_comments() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;
        let post = repo.create(author, &input("a", Utc::now(), None)).await.unwrap();
        add_comment(&pool, post.id, author).await;

        repo.delete(post.id).await.unwrap();
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());

        let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(pool.sqlite())
            .await
            .unwrap();
        assert_eq!(comments, 0);
    }

    #[tokio::test]
    async fn test_page_past_end_clamps_to_last() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "alice").await;
        let base = Utc::now() - Duration::days(1);
        for i in 0..12 {
            repo.create(author, &input(&format!("p{:02}", i), base + Duration::minutes(i), None))
                .await
                .unwrap();
        }

        let page = repo
            .list(&PostFilter::published(), &PageRequest::new(7, 10))
            .await
            .unwrap();
        assert_eq!(page.number, 2);
        assert_eq!(titles(&page), vec!["p01", "p00"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        /// Pages hold at most `per_page` posts, are disjoint, and together
        /// list every visible post newest first.
        #[test]
        fn property_paginated_listing_preserves_order(count in 0i64..25, per_page in 1u32..12) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (pool, repo) = setup().await;
                let author = create_user(&pool, "alice").await;
                let base = Utc::now() - Duration::days(1);
                for i in 0..count {
                    repo.create(author, &input(&format!("p{}", i), base + Duration::minutes(i), None))
                        .await
                        .unwrap();
                }

                let request = PageRequest::new(1, per_page);
                let num_pages = request.num_pages(count);
                let mut seen = Vec::new();
                for n in 1..=num_pages {
                    let page = repo
                        .list(&PostFilter::published(), &PageRequest::new(n, per_page))
                        .await
                        .unwrap();
                    assert!(page.items.len() <= per_page as usize);
                    seen.extend(page.items.into_iter().map(|p| p.post.pub_date));
                }

                assert_eq!(seen.len() as i64, count);
                assert!(seen.windows(2).all(|w| w[0] > w[1]));
            });
        }
    }
}
