//! Web layer - HTML handlers and routing
//!
//! This module contains every page of the site:
//! - post listing, detail and author CRUD
//! - category and profile listings
//! - comment CRUD
//! - login, registration and logout
//! - static pages and embedded assets
//! - the staff-only back office under `/admin/`

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod forms;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod profiles;
pub mod responses;
pub mod static_files;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use middleware::{AppState, CurrentUser, Viewer};
pub use responses::AppError;

/// Back-office routes (need staff)
fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/", get(admin::dashboard))
        .route("/admin/posts/", get(admin::posts))
        .route("/admin/posts/{id}/", get(admin::post_edit_form).post(admin::post_edit))
        .route("/admin/posts/{id}/inline/", post(admin::post_inline))
        .route(
            "/admin/posts/{id}/delete/",
            get(admin::post_delete_form).post(admin::post_delete),
        )
        .route("/admin/categories/", get(admin::categories))
        .route(
            "/admin/categories/add/",
            get(admin::category_add_form).post(admin::category_add),
        )
        .route(
            "/admin/categories/{id}/",
            get(admin::category_edit_form).post(admin::category_edit),
        )
        .route(
            "/admin/categories/{id}/delete/",
            get(admin::category_delete_form).post(admin::category_delete),
        )
        .route("/admin/locations/", get(admin::locations))
        .route(
            "/admin/locations/add/",
            get(admin::location_add_form).post(admin::location_add),
        )
        .route(
            "/admin/locations/{id}/",
            get(admin::location_edit_form).post(admin::location_edit),
        )
        .route(
            "/admin/locations/{id}/delete/",
            get(admin::location_delete_form).post(admin::location_delete),
        )
        .route("/admin/comments/", get(admin::comments))
        .route("/admin/comments/{id}/delete/", post(admin::comment_delete))
        .route("/admin/users/", get(admin::users))
        .route("/admin/users/{id}/staff/", post(admin::user_toggle_staff))
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
}

/// Public and author routes
fn site_router() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::index))
        .route("/posts/create/", get(posts::create_form).post(posts::create))
        .route("/posts/{id}/", get(posts::detail))
        .route("/posts/{id}/edit/", get(posts::edit_form).post(posts::edit))
        .route("/posts/{id}/delete/", get(posts::delete_form).post(posts::delete))
        .route("/posts/{id}/comment/", post(comments::add_comment))
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            get(comments::edit_form).post(comments::edit),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            get(comments::delete_form).post(comments::delete),
        )
        .route("/category/{slug}/", get(categories::category_posts))
        .route("/profile/edit/", get(profiles::edit_form).post(profiles::edit))
        .route("/profile/{username}/", get(profiles::profile))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .route(
            "/auth/registration/",
            get(auth::registration_form).post(auth::register),
        )
        .route("/pages/about/", get(pages::about))
        .route("/pages/rules/", get(pages::rules))
        .route("/static/{*path}", get(static_files::serve_static))
}

async fn not_found() -> AppError {
    AppError::NotFound("no route".to_string())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(site_router())
        .merge(admin_router())
        .fallback(not_found)
        // Error pages need the session, so they run inside it
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests;
