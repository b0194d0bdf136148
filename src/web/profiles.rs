//! Profile pages
//!
//! The public profile lists a user's posts; the owner also sees unpublished
//! and scheduled ones. Editing always targets the acting user.

use axum::{
    extract::{OriginalUri, Query, State},
    response::{IntoResponse, Response},
    Form,
};

use crate::models::User;
use crate::services::UserServiceError;

use super::common::{PageQuery, RoutePath};
use super::forms::{FormErrors, ProfileForm};
use super::middleware::{AppState, CurrentUser, Viewer};
use super::posts::profile_url;
use super::responses::{page_context, render, see_other, AppError, HandlerResult};

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    RoutePath(username): RoutePath<String>,
    Query(query): Query<PageQuery>,
) -> HandlerResult {
    let profile = state
        .user_service
        .get_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;

    let page = state
        .post_service
        .list_by_author(&profile, viewer.user(), &query.request(&state))
        .await?;

    let mut ctx = page_context(viewer.user(), uri.path());
    ctx.insert("is_owner", &viewer.user().is_some_and(|u| u.id == profile.id));
    ctx.insert("avatar_url", &profile.avatar_url());
    ctx.insert("display_name", &profile.display_name());
    ctx.insert("profile", &profile);
    ctx.insert("page_obj", &page);
    Ok(render(&state, "blog/profile.html", &ctx)?.into_response())
}

/// GET /profile/edit/
pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    let form = ProfileForm::from_user(&user);
    render_profile_form(&state, &user, uri.path(), &form, &FormErrors::default())
}

/// POST /profile/edit/
pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<ProfileForm>,
) -> HandlerResult {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return render_profile_form(&state, &user, uri.path(), &form, &errors),
    };

    match state.user_service.update_profile(user.id, input).await {
        Ok(updated) => Ok(see_other(profile_url(&updated.username))),
        Err(UserServiceError::UserExists(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", "Пользователь с таким именем уже существует.");
            render_profile_form(&state, &user, uri.path(), &form, &errors)
        }
        Err(UserServiceError::ValidationError(message)) => {
            render_profile_form(&state, &user, uri.path(), &form, &FormErrors::non_field(message))
        }
        Err(e) => Err(e.into()),
    }
}

fn render_profile_form(
    state: &AppState,
    user: &User,
    path: &str,
    form: &ProfileForm,
    errors: &FormErrors,
) -> HandlerResult<Response> {
    let mut ctx = page_context(Some(user), path);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(render(state, "blog/user.html", &ctx)?.into_response())
}
