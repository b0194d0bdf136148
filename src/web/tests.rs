//! End-to-end tests through the full router

use std::collections::BTreeSet;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use regex::Regex;

use super::*;
use crate::config::Config;
use crate::db::{create_test_pool, migrations};
use crate::models::{Category, CategoryInput, Post, PostInput, User};
use crate::services::{LoginInput, RegisterInput};
use crate::templates::TemplateEngine;

const PASSWORD: &str = "correct-horse";

struct TestApp {
    server: TestServer,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let templates = TemplateEngine::new(None).expect("Failed to load templates");
        let state = AppState::new(pool, Config::default(), templates);
        let server = TestServer::new(build_router(state.clone())).expect("Failed to start test server");
        Self { server, state }
    }

    /// Register a user; the first one registered becomes staff
    async fn user(&self, username: &str) -> User {
        self.state
            .user_service
            .register(RegisterInput::new(
                username,
                format!("{}@example.com", username),
                PASSWORD,
            ))
            .await
            .unwrap()
    }

    async fn token(&self, user: &User) -> String {
        self.state
            .user_service
            .login(LoginInput::new(user.username.clone(), PASSWORD))
            .await
            .unwrap()
            .id
    }

    async fn post(&self, author: &User, title: &str, setup: impl FnOnce(&mut PostInput)) -> Post {
        let mut input = PostInput {
            title: title.to_string(),
            text: format!("Text of {}", title),
            pub_date: Utc::now() - Duration::hours(1),
            location_id: None,
            category_id: None,
            is_published: true,
        };
        setup(&mut input);
        self.state.post_service.create(author, input).await.unwrap()
    }

    async fn category(&self, slug: &str, is_published: bool) -> Category {
        self.state
            .category_service
            .create(CategoryInput {
                title: format!("Category {}", slug),
                description: String::new(),
                slug: slug.to_string(),
                is_published,
            })
            .await
            .unwrap()
    }
}

fn location_of(response: &axum_test::TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .unwrap()
        .to_string()
}

fn entry_titles(html: &str) -> BTreeSet<String> {
    let re = Regex::new(r"entry-\d{2}").unwrap();
    re.find_iter(html).map(|m| m.as_str().to_string()).collect()
}

#[tokio::test]
async fn test_index_hides_unpublished_future_and_hidden_category_posts() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let hidden = app.category("hidden", false).await;

    app.post(&alice, "visible-post", |_| {}).await;
    app.post(&alice, "draft-post", |p| p.is_published = false).await;
    app.post(&alice, "future-post", |p| p.pub_date = Utc::now() + Duration::days(3)).await;
    app.post(&alice, "hidden-category-post", |p| p.category_id = Some(hidden.id)).await;

    let response = app.server.get("/").await;
    assert_eq!(response.status_code(), 200);
    let html = response.text();
    assert!(html.contains("visible-post"));
    assert!(!html.contains("draft-post"));
    assert!(!html.contains("future-post"));
    assert!(!html.contains("hidden-category-post"));
}

#[tokio::test]
async fn test_profile_shows_hidden_posts_only_to_owner() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    app.post(&alice, "visible-post", |_| {}).await;
    app.post(&alice, "draft-post", |p| p.is_published = false).await;
    app.post(&alice, "future-post", |p| p.pub_date = Utc::now() + Duration::days(3)).await;

    let bob_token = app.token(&bob).await;
    let html = app
        .server
        .get("/profile/alice/")
        .authorization_bearer(bob_token)
        .await
        .text();
    assert!(html.contains("visible-post"));
    assert!(!html.contains("draft-post"));
    assert!(!html.contains("future-post"));

    let alice_token = app.token(&alice).await;
    let html = app
        .server
        .get("/profile/alice/")
        .authorization_bearer(alice_token)
        .await
        .text();
    assert!(html.contains("visible-post"));
    assert!(html.contains("draft-post"));
    assert!(html.contains("future-post"));
}

#[tokio::test]
async fn test_unknown_profile_is_404() {
    let app = TestApp::new().await;
    let response = app.server.get("/profile/nobody/").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_detail_of_hidden_post_is_404_except_for_author() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let draft = app.post(&alice, "draft-post", |p| p.is_published = false).await;
    let url = format!("/posts/{}/", draft.id);

    assert_eq!(app.server.get(&url).await.status_code(), 404);

    let bob_token = app.token(&bob).await;
    let response = app.server.get(&url).authorization_bearer(bob_token).await;
    assert_eq!(response.status_code(), 404);

    let alice_token = app.token(&alice).await;
    let response = app.server.get(&url).authorization_bearer(alice_token).await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("draft-post"));
}

#[tokio::test]
async fn test_category_page() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let travel = app.category("travel", true).await;
    let hidden = app.category("hidden", false).await;

    app.post(&alice, "travel-post", |p| p.category_id = Some(travel.id)).await;
    app.post(&alice, "travel-draft", |p| {
        p.category_id = Some(travel.id);
        p.is_published = false;
    })
    .await;
    app.post(&alice, "uncategorised-post", |_| {}).await;

    let response = app.server.get("/category/travel/").await;
    assert_eq!(response.status_code(), 200);
    let html = response.text();
    assert!(html.contains("travel-post"));
    assert!(!html.contains("travel-draft"));
    assert!(!html.contains("uncategorised-post"));

    assert_eq!(app.server.get("/category/hidden/").await.status_code(), 404);
    assert_eq!(app.server.get("/category/missing/").await.status_code(), 404);
    assert!(!hidden.is_published);
}

#[tokio::test]
async fn test_comment_count_on_listing() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let post = app.post(&alice, "busy-post", |_| {}).await;

    app.state.comment_service.create(post.id, &alice, "first").await.unwrap();
    app.state.comment_service.create(post.id, &bob, "second").await.unwrap();

    let html = app.server.get("/").await.text();
    assert!(html.contains("Комментарии (2)"));
}

#[tokio::test]
async fn test_index_pagination_is_capped_and_disjoint() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    for i in 0..15 {
        let title = format!("entry-{:02}", i);
        app.post(&alice, &title, |p| p.pub_date = Utc::now() - Duration::minutes(i + 1)).await;
    }

    let first = entry_titles(&app.server.get("/").await.text());
    let second = entry_titles(&app.server.get("/").add_query_param("page", 2).await.text());
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 5);
    assert!(first.is_disjoint(&second));
    // Newest first
    assert!(first.contains("entry-00"));
    assert!(second.contains("entry-14"));

    // Out-of-range pages clamp to the last one
    let clamped = entry_titles(&app.server.get("/").add_query_param("page", 99).await.text());
    assert_eq!(clamped, second);
}

#[tokio::test]
async fn test_anonymous_create_redirects_to_login() {
    let app = TestApp::new().await;
    let response = app.server.get("/posts/create/").await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), "/auth/login/?next=%2Fposts%2Fcreate%2F");
}

#[tokio::test]
async fn test_create_post_redirects_to_profile() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let token = app.token(&alice).await;

    let response = app
        .server
        .post("/posts/create/")
        .authorization_bearer(token)
        .form(&[
            ("title", "fresh-post"),
            ("text", "Hello"),
            ("pub_date", ""),
            ("is_published", "on"),
        ])
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), "/profile/alice/");

    let html = app.server.get("/").await.text();
    assert!(html.contains("fresh-post"));
}

#[tokio::test]
async fn test_create_post_with_blank_title_rerenders_form() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let token = app.token(&alice).await;

    let response = app
        .server
        .post("/posts/create/")
        .authorization_bearer(token)
        .form(&[("title", "  "), ("text", "Hello")])
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("class=\"errors\""));
}

#[tokio::test]
async fn test_non_author_edit_redirects_without_change() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let post = app.post(&alice, "original-title", |_| {}).await;
    let bob_token = app.token(&bob).await;

    let response = app
        .server
        .post(&format!("/posts/{}/edit/", post.id))
        .authorization_bearer(bob_token)
        .form(&[("title", "hijacked"), ("text", "nope")])
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), format!("/posts/{}/", post.id));

    let stored = app.state.post_service.get_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "original-title");
}

#[tokio::test]
async fn test_author_edit_and_delete() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let post = app.post(&alice, "before", |_| {}).await;
    let token = app.token(&alice).await;

    let response = app
        .server
        .post(&format!("/posts/{}/edit/", post.id))
        .authorization_bearer(token.clone())
        .form(&[("title", "after"), ("text", "changed"), ("is_published", "on")])
        .await;
    assert_eq!(response.status_code(), 303);
    let stored = app.state.post_service.get_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "after");

    let response = app
        .server
        .post(&format!("/posts/{}/delete/", post.id))
        .authorization_bearer(token)
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), "/");
    assert!(app.state.post_service.get_by_id(post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_author_delete_is_404() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let post = app.post(&alice, "keep-me", |_| {}).await;
    let bob_token = app.token(&bob).await;

    let response = app
        .server
        .post(&format!("/posts/{}/delete/", post.id))
        .authorization_bearer(bob_token)
        .await;
    assert_eq!(response.status_code(), 404);
    assert!(app.state.post_service.get_by_id(post.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_add_comment() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let post = app.post(&alice, "chatty", |_| {}).await;
    let token = app.token(&alice).await;

    let response = app
        .server
        .post(&format!("/posts/{}/comment/", post.id))
        .authorization_bearer(token.clone())
        .form(&[("text", "Nice one")])
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), format!("/posts/{}/", post.id));

    let comments = app.state.comment_service.get_by_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment.text, "Nice one");

    // Missing post
    let response = app
        .server
        .post("/posts/9999/comment/")
        .authorization_bearer(token)
        .form(&[("text", "lost")])
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_non_author_comment_delete_is_forbidden() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let post = app.post(&alice, "discussed", |_| {}).await;
    let comment = app
        .state
        .comment_service
        .create(post.id, &alice, "mine")
        .await
        .unwrap();
    let bob_token = app.token(&bob).await;

    let response = app
        .server
        .post(&format!("/posts/{}/delete_comment/{}/", post.id, comment.id))
        .authorization_bearer(bob_token)
        .await;
    assert_eq!(response.status_code(), 403);
    assert!(response
        .text()
        .contains("Вы не авторизованы для удаления этого комментария."));

    let comments = app.state.comment_service.get_by_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
}

#[tokio::test]
async fn test_admin_requires_staff() {
    let app = TestApp::new().await;
    let staff = app.user("admin").await;
    let bob = app.user("bob").await;
    assert!(staff.is_staff);
    assert!(!bob.is_staff);

    let response = app.server.get("/admin/").await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), "/auth/login/?next=%2Fadmin%2F");

    let bob_token = app.token(&bob).await;
    let response = app.server.get("/admin/posts/").authorization_bearer(bob_token).await;
    assert_eq!(response.status_code(), 403);

    let staff_token = app.token(&staff).await;
    let response = app.server.get("/admin/").authorization_bearer(staff_token).await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_admin_post_search() {
    let app = TestApp::new().await;
    let staff = app.user("admin").await;
    app.post(&staff, "alpha-report", |_| {}).await;
    app.post(&staff, "beta-notes", |p| p.is_published = false).await;
    let token = app.token(&staff).await;

    let html = app
        .server
        .get("/admin/posts/")
        .add_query_param("q", "ALPHA")
        .authorization_bearer(token.clone())
        .await
        .text();
    assert!(html.contains("alpha-report"));
    assert!(!html.contains("beta-notes"));

    let html = app
        .server
        .get("/admin/posts/")
        .add_query_param("is_published", "0")
        .authorization_bearer(token)
        .await
        .text();
    assert!(!html.contains("alpha-report"));
    assert!(html.contains("beta-notes"));
}

#[tokio::test]
async fn test_admin_post_pages_keep_search_in_links() {
    let app = TestApp::new().await;
    let staff = app.user("admin").await;
    for i in 0..51 {
        app.post(&staff, &format!("alpha beta {:02}", i), |_| {}).await;
    }
    let token = app.token(&staff).await;

    let response = app
        .server
        .get("/admin/posts/")
        .add_query_param("q", "alpha beta")
        .add_query_param("is_published", "1")
        .authorization_bearer(token)
        .await;
    assert_eq!(response.status_code(), 200);
    let html = response.text();
    assert!(html.contains("q=alpha%20beta&amp;is_published=1&amp;page=2"));
}

#[tokio::test]
async fn test_malformed_ids_render_404_page() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let token = app.token(&alice).await;

    for url in [
        "/posts/abc/",
        "/posts/99999999999999999999999/",
        "/posts/1/edit_comment/x/",
        "/admin/posts/abc/",
    ] {
        let response = app.server.get(url).authorization_bearer(token.clone()).await;
        assert_eq!(response.status_code(), 404, "{}", url);
        assert!(response.text().contains("Страница, которую вы ищете, не найдена."), "{}", url);
    }
}

#[tokio::test]
async fn test_login_sets_cookie_and_follows_next() {
    let app = TestApp::new().await;
    app.user("alice").await;

    let response = app
        .server
        .post("/auth/login/")
        .form(&[
            ("username", "alice"),
            ("password", PASSWORD),
            ("next", "/posts/create/"),
        ])
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), "/posts/create/");
    let cookie = response.header("set-cookie").to_str().unwrap().to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let response = app
        .server
        .post("/auth/login/")
        .form(&[("username", "alice"), ("password", "wrong-password")])
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("class=\"errors\""));
}

#[tokio::test]
async fn test_registration_redirects_to_login() {
    let app = TestApp::new().await;
    let response = app
        .server
        .post("/auth/registration/")
        .form(&[
            ("username", "newcomer"),
            ("email", "newcomer@example.com"),
            ("password1", PASSWORD),
            ("password2", PASSWORD),
        ])
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location_of(&response), "/auth/login/");
    assert!(app
        .state
        .user_service
        .get_by_username("newcomer")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let token = app.token(&alice).await;

    let response = app
        .server
        .post("/auth/logout/")
        .authorization_bearer(token.clone())
        .await;
    assert_eq!(response.status_code(), 303);
    assert!(response.header("set-cookie").to_str().unwrap().contains("Max-Age=0"));
    assert!(app.state.user_service.validate_session(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_route_renders_404_page() {
    let app = TestApp::new().await;
    let response = app.server.get("/no/such/page/").await;
    assert_eq!(response.status_code(), 404);
    assert!(response.text().contains("<html"));
}

#[tokio::test]
async fn test_static_pages_and_assets() {
    let app = TestApp::new().await;
    assert_eq!(app.server.get("/pages/about/").await.status_code(), 200);
    assert_eq!(app.server.get("/pages/rules/").await.status_code(), 200);

    let response = app.server.get("/static/css/blogicum.css").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "text/css; charset=utf-8"
    );
    assert_eq!(app.server.get("/static/missing.css").await.status_code(), 404);
}
