//! Post pages: index, detail, create, edit, delete

use axum::{
    extract::{OriginalUri, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use chrono::Utc;

use crate::models::{PostWithMeta, User};
use crate::services::PostServiceError;

use super::common::{PageQuery, RoutePath};
use super::forms::{FormErrors, PostForm};
use super::middleware::{AppState, CurrentUser, Viewer};
use super::responses::{page_context, render, see_other, HandlerResult};

/// Which page `blog/create.html` is serving
#[derive(Debug, Clone, Copy)]
enum FormMode {
    Create,
    Edit,
    Delete,
}

impl FormMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

pub fn detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

/// GET / - every publicly visible post, newest first
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> HandlerResult {
    let page = state.post_service.list_published(&query.request(&state)).await?;

    let mut ctx = page_context(viewer.user(), uri.path());
    ctx.insert("page_obj", &page);
    Ok(render(&state, "blog/index.html", &ctx)?.into_response())
}

/// GET /posts/{id}/
pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    let post = state.post_service.get_detail(id, viewer.user()).await?;
    let comments = state.comment_service.get_by_post(id).await?;
    let is_author = viewer.user().is_some_and(|u| post.post.is_authored_by(u.id));

    let mut ctx = page_context(viewer.user(), uri.path());
    ctx.insert("post", &post);
    ctx.insert("comments", &comments);
    ctx.insert("is_author", &is_author);
    Ok(render(&state, "blog/detail.html", &ctx)?.into_response())
}

/// GET /posts/create/
pub async fn create_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    let form = PostForm::initial(Utc::now());
    render_post_form(&state, &user, uri.path(), FormMode::Create, &form, &FormErrors::default(), None).await
}

/// POST /posts/create/ - the author is always the acting user
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<PostForm>,
) -> HandlerResult {
    let input = match form.validate(Utc::now()) {
        Ok(input) => input,
        Err(errors) => {
            return render_post_form(&state, &user, uri.path(), FormMode::Create, &form, &errors, None).await
        }
    };

    match state.post_service.create(&user, input).await {
        Ok(_) => Ok(see_other(profile_url(&user.username))),
        Err(PostServiceError::ValidationError(message)) => {
            let errors = FormErrors::non_field(message);
            render_post_form(&state, &user, uri.path(), FormMode::Create, &form, &errors, None).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/edit/ - anyone but the author is sent to the detail page
pub async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    let (user, post) = match state.post_service.get_for_edit(id, viewer.user()).await {
        Ok(post) => match viewer.0 {
            Some(user) => (user, post),
            None => return Ok(see_other(detail_url(id))),
        },
        Err(PostServiceError::NotAuthor { .. }) => return Ok(see_other(detail_url(id))),
        Err(e) => return Err(e.into()),
    };

    let form = PostForm::from_post(&post);
    render_post_form(&state, &user, uri.path(), FormMode::Edit, &form, &FormErrors::default(), None).await
}

/// POST /posts/{id}/edit/
pub async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
    Form(form): Form<PostForm>,
) -> HandlerResult {
    let user = match state.post_service.get_for_edit(id, viewer.user()).await {
        Ok(_) => match viewer.0 {
            Some(user) => user,
            None => return Ok(see_other(detail_url(id))),
        },
        Err(PostServiceError::NotAuthor { post_id, user_id }) => {
            tracing::debug!(post_id, ?user_id, "Edit by non-author redirected");
            return Ok(see_other(detail_url(id)));
        }
        Err(e) => return Err(e.into()),
    };

    let input = match form.validate(Utc::now()) {
        Ok(input) => input,
        Err(errors) => {
            return render_post_form(&state, &user, uri.path(), FormMode::Edit, &form, &errors, None).await
        }
    };

    match state.post_service.update(id, &user, input).await {
        Ok(_) => Ok(see_other(detail_url(id))),
        Err(PostServiceError::ValidationError(message)) => {
            let errors = FormErrors::non_field(message);
            render_post_form(&state, &user, uri.path(), FormMode::Edit, &form, &errors, None).await
        }
        Err(PostServiceError::NotAuthor { .. }) => Ok(see_other(detail_url(id))),
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/delete/ - confirmation page; only the author's own posts resolve
pub async fn delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    let post = state.post_service.get_own(id, &user).await?;
    let form = PostForm::from_post(&post.post);
    render_post_form(
        &state,
        &user,
        uri.path(),
        FormMode::Delete,
        &form,
        &FormErrors::default(),
        Some(&post),
    )
    .await
}

/// POST /posts/{id}/delete/
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    state.post_service.delete(id, &user).await?;
    Ok(see_other("/"))
}

async fn render_post_form(
    state: &AppState,
    user: &User,
    path: &str,
    mode: FormMode,
    form: &PostForm,
    errors: &FormErrors,
    post: Option<&PostWithMeta>,
) -> HandlerResult<Response> {
    let categories = state.category_service.list().await?;
    let locations = state.location_service.list().await?;

    let mut ctx = page_context(Some(user), path);
    ctx.insert("mode", mode.as_str());
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("categories", &categories);
    ctx.insert("locations", &locations);
    if let Some(post) = post {
        ctx.insert("post", post);
    }
    Ok(render(state, "blog/create.html", &ctx)?.into_response())
}
