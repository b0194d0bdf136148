//! Handler error type and page rendering helpers

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tera::Context as TeraContext;

use crate::models::User;
use crate::services::{
    CategoryServiceError, CommentServiceError, LocationServiceError, PostServiceError,
    UserServiceError,
};
use crate::templates::{StandardTemplateVars, TemplateError};

use super::middleware::AppState;

/// Marker left in the extensions of an error response; the error page layer
/// renders it.
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

/// Errors a handler may return
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Carries the message shown to the user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                (StatusCode::NOT_FOUND, String::new())
            }
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            AppError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        };

        let mut response = (status, message.clone()).into_response();
        response.extensions_mut().insert(ErrorPage { status, message });
        response
    }
}

impl From<TemplateError> for AppError {
    fn from(e: TemplateError) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<PostServiceError> for AppError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(what) => AppError::NotFound(what),
            PostServiceError::NotAuthor { post_id, .. } => AppError::NotFound(format!("post {}", post_id)),
            PostServiceError::ValidationError(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            PostServiceError::InternalError(e) => AppError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for AppError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(what) => AppError::NotFound(what),
            CommentServiceError::PermissionDenied(message) => AppError::Forbidden(message),
            CommentServiceError::ValidationError(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            CommentServiceError::InternalError(e) => AppError::Internal(e),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<CategoryServiceError> for AppError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<LocationServiceError> for AppError {
    fn from(e: LocationServiceError) -> Self {
        match e {
            LocationServiceError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Internal(other.into()),
        }
    }
}

pub type HandlerResult<T = Response> = Result<T, AppError>;

/// Context with the standard page variables filled in
pub fn page_context(viewer: Option<&User>, path: &str) -> TeraContext {
    StandardTemplateVars::new(viewer.cloned(), path).into_context()
}

/// Render a page template
pub fn render(state: &AppState, template: &str, ctx: &TeraContext) -> HandlerResult<Html<String>> {
    Ok(Html(state.templates.render(template, ctx)?))
}

/// Post/redirect/get redirect
pub fn see_other(location: impl AsRef<str>) -> Response {
    Redirect::to(location.as_ref()).into_response()
}
