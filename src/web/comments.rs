//! Comment handlers
//!
//! Adding needs a login. Editing and deleting need the comment's author;
//! anyone else gets a 403 page with the service's message.

use axum::{
    extract::{OriginalUri, State},
    response::{IntoResponse, Response},
    Form,
};

use crate::models::{Comment, User};
use crate::services::{CommentAction, CommentServiceError};

use super::common::RoutePath;
use super::forms::{CommentForm, FormErrors};
use super::middleware::{AppState, CurrentUser};
use super::posts::detail_url;
use super::responses::{page_context, render, see_other, AppError, HandlerResult};

/// POST /posts/{id}/comment/ - an empty comment is dropped silently
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RoutePath(post_id): RoutePath<i64>,
    Form(form): Form<CommentForm>,
) -> HandlerResult {
    match form.validate() {
        Ok(text) => match state.comment_service.create(post_id, &user, &text).await {
            Ok(_) | Err(CommentServiceError::ValidationError(_)) => {}
            Err(e) => return Err(e.into()),
        },
        Err(_) => {
            if state.post_service.get_by_id(post_id).await?.is_none() {
                return Err(AppError::NotFound(format!("post {}", post_id)));
            }
        }
    }
    Ok(see_other(detail_url(post_id)))
}

/// GET /posts/{id}/edit_comment/{comment_id}/
pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath((post_id, comment_id)): RoutePath<(i64, i64)>,
) -> HandlerResult {
    let comment = state
        .comment_service
        .get_authorized(post_id, comment_id, &user, CommentAction::Edit)
        .await?;
    let form = CommentForm {
        text: comment.text.clone(),
    };
    render_comment_page(&state, &user, uri.path(), &comment, Some(&form), &FormErrors::default())
}

/// POST /posts/{id}/edit_comment/{comment_id}/
pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath((post_id, comment_id)): RoutePath<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> HandlerResult {
    let comment = state
        .comment_service
        .get_authorized(post_id, comment_id, &user, CommentAction::Edit)
        .await?;

    let text = match form.validate() {
        Ok(text) => text,
        Err(errors) => return render_comment_page(&state, &user, uri.path(), &comment, Some(&form), &errors),
    };

    state
        .comment_service
        .update(post_id, comment_id, &user, &text)
        .await?;
    Ok(see_other(detail_url(post_id)))
}

/// GET /posts/{id}/delete_comment/{comment_id}/ - confirmation page
pub async fn delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath((post_id, comment_id)): RoutePath<(i64, i64)>,
) -> HandlerResult {
    let comment = state
        .comment_service
        .get_authorized(post_id, comment_id, &user, CommentAction::Delete)
        .await?;
    render_comment_page(&state, &user, uri.path(), &comment, None, &FormErrors::default())
}

/// POST /posts/{id}/delete_comment/{comment_id}/
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RoutePath((post_id, comment_id)): RoutePath<(i64, i64)>,
) -> HandlerResult {
    state.comment_service.delete(post_id, comment_id, &user).await?;
    Ok(see_other(detail_url(post_id)))
}

/// `blog/comment.html` shows the edit form when `form` is set, the delete
/// confirmation otherwise.
fn render_comment_page(
    state: &AppState,
    user: &User,
    path: &str,
    comment: &Comment,
    form: Option<&CommentForm>,
    errors: &FormErrors,
) -> HandlerResult<Response> {
    let mut ctx = page_context(Some(user), path);
    ctx.insert("comment", comment);
    ctx.insert("form", &form);
    ctx.insert("errors", errors);
    Ok(render(state, "blog/comment.html", &ctx)?.into_response())
}
