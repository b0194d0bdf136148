//! Web middleware and extractors
//!
//! - session loading: resolves the `session` cookie (or a Bearer token) to a
//!   user once per request
//! - `Viewer` / `CurrentUser` extractors hand that identity to handlers
//! - the staff guard for the back office
//! - error page rendering for 403/404/500 responses

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::config::Config;
use crate::db::repositories::{
    CommentRepositoryImpl, SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{CategoryService, CommentService, LocationService, PostService, UserService};
use crate::templates::{StandardTemplateVars, TemplateEngine};

use super::responses::{AppError, ErrorPage};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub location_service: Arc<LocationService>,
    pub templates: Arc<TemplateEngine>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, config: Config, templates: TemplateEngine) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let location_repo = SqlxLocationRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = Arc::new(CommentRepositoryImpl::new(pool));

        Self {
            user_service: Arc::new(UserService::with_session_expiration(
                user_repo,
                session_repo,
                config.auth.session_days,
            )),
            post_service: Arc::new(PostService::new(
                post_repo.clone(),
                category_repo.clone(),
                location_repo.clone(),
            )),
            comment_service: Arc::new(CommentService::new(comment_repo, post_repo)),
            category_service: Arc::new(CategoryService::new(category_repo)),
            location_service: Arc::new(LocationService::new(location_repo)),
            templates: Arc::new(templates),
            config: Arc::new(config),
        }
    }
}

/// Authenticated user stored in request extensions by [`load_session`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Extract session token from the `Authorization` header or the session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Resolve the session, if any, and attach the user to the request.
///
/// An unknown or expired token simply leaves the request anonymous.
pub async fn load_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Optional identity of whoever is making the request
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}

/// An authenticated user; anonymous requests are sent to the login page
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(au) => Ok(Self(au.0.clone())),
            None => Err(login_redirect(parts.uri.path()).into_response()),
        }
    }
}

/// Redirect to the login page, coming back to `next` afterwards
pub fn login_redirect(next: &str) -> Redirect {
    Redirect::to(&format!("/auth/login/?next={}", urlencoding::encode(next)))
}

/// Back-office guard: anonymous users go to login, others need the staff flag
pub async fn require_staff(request: Request, next: Next) -> Result<Response, Response> {
    let Some(user) = request.extensions().get::<AuthenticatedUser>() else {
        return Err(login_redirect(request.uri().path()).into_response());
    };

    if !user.0.is_staff {
        tracing::warn!(user_id = user.0.id, path = %request.uri().path(), "Back office access denied");
        return Err(AppError::Forbidden("Доступ только для персонала.".to_string()).into_response());
    }

    Ok(next.run(request).await)
}

/// Replace bare error responses with the rendered error templates.
///
/// Handlers return [`AppError`], which leaves an [`ErrorPage`] marker in the
/// response extensions; this layer turns the marker into HTML.
pub async fn render_error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let viewer = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|au| au.0.clone());
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let template = match page.status {
        StatusCode::NOT_FOUND => "pages/404.html",
        StatusCode::FORBIDDEN => "pages/403.html",
        _ => "pages/500.html",
    };
    let mut ctx = StandardTemplateVars::new(viewer, path).into_context();
    ctx.insert("message", &page.message);

    let html = state.templates.render_with_fallback(template, &ctx);
    (page.status, Html(html)).into_response()
}
