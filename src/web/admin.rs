//! Back office
//!
//! Staff-only CRUD over posts, categories, locations, comments and users.
//! Every route here sits behind `require_staff`. Missing values display as
//! "Не задано".

use axum::{
    extract::{OriginalUri, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::models::{PageRequest, PostFilter, User};
use crate::services::{CategoryServiceError, LocationServiceError, PostServiceError};

use super::common::{PageQuery, RoutePath};
use super::forms::{CategoryForm, FormErrors, LocationForm, PostForm, PostInlineForm};
use super::middleware::{AppState, CurrentUser};
use super::responses::{page_context, render, see_other, AppError, HandlerResult};

/// Rows per back-office list page
pub const ADMIN_PAGE_SIZE: u32 = 50;

fn admin_page(query: &PageQuery) -> PageRequest {
    PageRequest::from_query(query.page.as_deref(), ADMIN_PAGE_SIZE)
}

fn render_page(state: &AppState, template: &str, ctx: &TeraContext) -> HandlerResult {
    Ok(render(state, template, ctx)?.into_response())
}

// ============================================================================
// Dashboard
// ============================================================================

/// GET /admin/
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    let mut ctx = page_context(Some(&user), uri.path());
    ctx.insert("post_count", &state.post_service.count(&PostFilter::all()).await?);
    ctx.insert(
        "published_count",
        &state.post_service.count(&PostFilter::published()).await?,
    );
    ctx.insert("category_count", &state.category_service.count().await?);
    ctx.insert("location_count", &state.location_service.count().await?);
    ctx.insert("comment_count", &state.comment_service.count().await?);
    ctx.insert("user_count", &state.user_service.count().await?);
    render_page(&state, "admin/index.html", &ctx)
}

// ============================================================================
// Posts
// ============================================================================

/// Search and filter parameters of the post list
#[derive(Debug, Default, Deserialize)]
pub struct AdminPostQuery {
    #[serde(default)]
    pub q: Option<String>,
    /// "1" published only, "0" unpublished only, anything else both
    #[serde(default)]
    pub is_published: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl AdminPostQuery {
    fn filter(&self) -> PostFilter {
        let mut filter = PostFilter::all();
        filter.title_query = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        filter.is_published = match self.is_published.as_deref() {
            Some("1") => Some(true),
            Some("0") => Some(false),
            _ => None,
        };
        filter
    }
}

/// GET /admin/posts/
pub async fn posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<AdminPostQuery>,
) -> HandlerResult {
    render_post_list(&state, &user, uri.path(), &query, &FormErrors::default()).await
}

/// POST /admin/posts/{id}/inline/ - author, location, category and flag from the list row
pub async fn post_inline(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RoutePath(id): RoutePath<i64>,
    Form(form): Form<PostInlineForm>,
) -> HandlerResult {
    let errors = match form.validate() {
        Ok(update) => {
            if state.user_service.get_by_id(update.author_id).await?.is_none() {
                FormErrors::non_field("Выбранный автор не существует.")
            } else {
                match state.post_service.admin_update_inline(id, update).await {
                    Ok(_) => return Ok(see_other("/admin/posts/")),
                    Err(PostServiceError::ValidationError(message)) => FormErrors::non_field(message),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Err(errors) => errors,
    };
    render_post_list(&state, &user, "/admin/posts/", &AdminPostQuery::default(), &errors).await
}

async fn render_post_list(
    state: &AppState,
    user: &User,
    path: &str,
    query: &AdminPostQuery,
    errors: &FormErrors,
) -> HandlerResult {
    let request = PageRequest::from_query(query.page.as_deref(), ADMIN_PAGE_SIZE);
    let page = state.post_service.list(&query.filter(), &request).await?;

    let mut ctx = page_context(Some(user), path);
    ctx.insert("page_obj", &page);
    ctx.insert("q", query.q.as_deref().unwrap_or(""));
    ctx.insert("is_published", query.is_published.as_deref().unwrap_or(""));
    ctx.insert("authors", &state.user_service.list_all().await?);
    ctx.insert("categories", &state.category_service.list().await?);
    ctx.insert("locations", &state.location_service.list().await?);
    ctx.insert("errors", errors);
    render_page(state, "admin/posts.html", &ctx)
}

/// GET /admin/posts/{id}/
pub async fn post_edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    let post = state
        .post_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;
    render_post_form(&state, &user, uri.path(), id, &PostForm::from_post(&post), &FormErrors::default()).await
}

/// POST /admin/posts/{id}/
pub async fn post_edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
    Form(form): Form<PostForm>,
) -> HandlerResult {
    let input = match form.validate(Utc::now()) {
        Ok(input) => input,
        Err(errors) => return render_post_form(&state, &user, uri.path(), id, &form, &errors).await,
    };
    match state.post_service.admin_update(id, input).await {
        Ok(_) => Ok(see_other("/admin/posts/")),
        Err(PostServiceError::ValidationError(message)) => {
            render_post_form(&state, &user, uri.path(), id, &form, &FormErrors::non_field(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_post_form(
    state: &AppState,
    user: &User,
    path: &str,
    id: i64,
    form: &PostForm,
    errors: &FormErrors,
) -> HandlerResult {
    let post = state
        .post_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;
    let author = state.user_service.get_by_id(post.author_id).await?;

    let mut ctx = page_context(Some(user), path);
    ctx.insert("post_id", &id);
    ctx.insert("author", &author);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("categories", &state.category_service.list().await?);
    ctx.insert("locations", &state.location_service.list().await?);
    render_page(state, "admin/post_form.html", &ctx)
}

/// GET /admin/posts/{id}/delete/
pub async fn post_delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    let post = state
        .post_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;
    render_confirm_delete(&state, &user, uri.path(), &post.title, "/admin/posts/")
}

/// POST /admin/posts/{id}/delete/ - comments go with the post
pub async fn post_delete(State(state): State<AppState>, RoutePath(id): RoutePath<i64>) -> HandlerResult {
    state.post_service.admin_delete(id).await?;
    Ok(see_other("/admin/posts/"))
}

// ============================================================================
// Categories
// ============================================================================

/// GET /admin/categories/
pub async fn categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    let mut ctx = page_context(Some(&user), uri.path());
    ctx.insert("categories", &state.category_service.list().await?);
    render_page(&state, "admin/categories.html", &ctx)
}

/// GET /admin/categories/add/
pub async fn category_add_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    render_category_form(&state, &user, uri.path(), None, &CategoryForm::initial(), &FormErrors::default(), &PageQuery::default())
        .await
}

/// POST /admin/categories/add/
pub async fn category_add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<CategoryForm>,
) -> HandlerResult {
    save_category(&state, &user, uri.path(), None, form).await
}

/// GET /admin/categories/{id}/ - form plus the category's posts
pub async fn category_edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
    Query(query): Query<PageQuery>,
) -> HandlerResult {
    let category = state
        .category_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {}", id)))?;
    let form = CategoryForm::from_category(&category);
    render_category_form(&state, &user, uri.path(), Some(id), &form, &FormErrors::default(), &query).await
}

/// POST /admin/categories/{id}/
pub async fn category_edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
    Form(form): Form<CategoryForm>,
) -> HandlerResult {
    save_category(&state, &user, uri.path(), Some(id), form).await
}

async fn save_category(
    state: &AppState,
    user: &User,
    path: &str,
    id: Option<i64>,
    form: CategoryForm,
) -> HandlerResult {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return render_category_form(state, user, path, id, &form, &errors, &PageQuery::default()).await
        }
    };

    let result = match id {
        Some(id) => state.category_service.update(id, input).await,
        None => state.category_service.create(input).await,
    };

    let errors = match result {
        Ok(_) => return Ok(see_other("/admin/categories/")),
        Err(CategoryServiceError::DuplicateSlug(_)) => {
            let mut errors = FormErrors::default();
            errors.add("slug", "Категория с таким идентификатором уже существует.");
            errors
        }
        Err(CategoryServiceError::ValidationError(message)) => FormErrors::non_field(message),
        Err(e) => return Err(e.into()),
    };
    render_category_form(state, user, path, id, &form, &errors, &PageQuery::default()).await
}

async fn render_category_form(
    state: &AppState,
    user: &User,
    path: &str,
    id: Option<i64>,
    form: &CategoryForm,
    errors: &FormErrors,
    query: &PageQuery,
) -> HandlerResult {
    let mut ctx = page_context(Some(user), path);
    ctx.insert("category_id", &id);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    if let Some(id) = id {
        let posts = state
            .post_service
            .list(&PostFilter::all().with_category(id), &admin_page(query))
            .await?;
        ctx.insert("page_obj", &posts);
    }
    render_page(state, "admin/category_form.html", &ctx)
}

/// GET /admin/categories/{id}/delete/
pub async fn category_delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    let category = state
        .category_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {}", id)))?;
    render_confirm_delete(&state, &user, uri.path(), &category.title, "/admin/categories/")
}

/// POST /admin/categories/{id}/delete/ - posts stay, without a category
pub async fn category_delete(State(state): State<AppState>, RoutePath(id): RoutePath<i64>) -> HandlerResult {
    state.category_service.delete(id).await?;
    Ok(see_other("/admin/categories/"))
}

// ============================================================================
// Locations
// ============================================================================

/// GET /admin/locations/
pub async fn locations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    let mut ctx = page_context(Some(&user), uri.path());
    ctx.insert("locations", &state.location_service.list().await?);
    render_page(&state, "admin/locations.html", &ctx)
}

/// GET /admin/locations/add/
pub async fn location_add_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    render_location_form(&state, &user, uri.path(), None, &LocationForm::initial(), &FormErrors::default(), &PageQuery::default())
        .await
}

/// POST /admin/locations/add/
pub async fn location_add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<LocationForm>,
) -> HandlerResult {
    save_location(&state, &user, uri.path(), None, form).await
}

/// GET /admin/locations/{id}/ - form plus the location's posts
pub async fn location_edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
    Query(query): Query<PageQuery>,
) -> HandlerResult {
    let location = state
        .location_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("location {}", id)))?;
    let form = LocationForm::from_location(&location);
    render_location_form(&state, &user, uri.path(), Some(id), &form, &FormErrors::default(), &query).await
}

/// POST /admin/locations/{id}/
pub async fn location_edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
    Form(form): Form<LocationForm>,
) -> HandlerResult {
    save_location(&state, &user, uri.path(), Some(id), form).await
}

async fn save_location(
    state: &AppState,
    user: &User,
    path: &str,
    id: Option<i64>,
    form: LocationForm,
) -> HandlerResult {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return render_location_form(state, user, path, id, &form, &errors, &PageQuery::default()).await
        }
    };

    let result = match id {
        Some(id) => state.location_service.update(id, input).await,
        None => state.location_service.create(input).await,
    };

    match result {
        Ok(_) => Ok(see_other("/admin/locations/")),
        Err(LocationServiceError::ValidationError(message)) => {
            let errors = FormErrors::non_field(message);
            render_location_form(state, user, path, id, &form, &errors, &PageQuery::default()).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_location_form(
    state: &AppState,
    user: &User,
    path: &str,
    id: Option<i64>,
    form: &LocationForm,
    errors: &FormErrors,
    query: &PageQuery,
) -> HandlerResult {
    let mut ctx = page_context(Some(user), path);
    ctx.insert("location_id", &id);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    if let Some(id) = id {
        let posts = state
            .post_service
            .list(&PostFilter::all().with_location(id), &admin_page(query))
            .await?;
        ctx.insert("page_obj", &posts);
    }
    render_page(state, "admin/location_form.html", &ctx)
}

/// GET /admin/locations/{id}/delete/
pub async fn location_delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    let location = state
        .location_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("location {}", id)))?;
    render_confirm_delete(&state, &user, uri.path(), &location.name, "/admin/locations/")
}

/// POST /admin/locations/{id}/delete/
pub async fn location_delete(State(state): State<AppState>, RoutePath(id): RoutePath<i64>) -> HandlerResult {
    state.location_service.delete(id).await?;
    Ok(see_other("/admin/locations/"))
}

// ============================================================================
// Comments and users
// ============================================================================

/// GET /admin/comments/ - newest first
pub async fn comments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> HandlerResult {
    let page = state.comment_service.list(&admin_page(&query)).await?;
    let mut ctx = page_context(Some(&user), uri.path());
    ctx.insert("page_obj", &page);
    render_page(&state, "admin/comments.html", &ctx)
}

/// POST /admin/comments/{id}/delete/
pub async fn comment_delete(State(state): State<AppState>, RoutePath(id): RoutePath<i64>) -> HandlerResult {
    state.comment_service.admin_delete(id).await?;
    Ok(see_other("/admin/comments/"))
}

/// GET /admin/users/
pub async fn users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> HandlerResult {
    let page = state.user_service.list(&admin_page(&query)).await?;
    let mut ctx = page_context(Some(&user), uri.path());
    ctx.insert("page_obj", &page);
    render_page(&state, "admin/users.html", &ctx)
}

/// POST /admin/users/{id}/staff/ - flips the staff flag; not on oneself
pub async fn user_toggle_staff(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RoutePath(id): RoutePath<i64>,
) -> HandlerResult {
    if id == user.id {
        return Err(AppError::Forbidden(
            "Нельзя изменить права персонала для своей учётной записи.".to_string(),
        ));
    }
    let target = state
        .user_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    state.user_service.set_staff(id, !target.is_staff).await?;
    Ok(see_other("/admin/users/"))
}

fn render_confirm_delete(
    state: &AppState,
    user: &User,
    path: &str,
    object_label: &str,
    cancel_url: &str,
) -> Result<Response, AppError> {
    let mut ctx = page_context(Some(user), path);
    ctx.insert("object_label", object_label);
    ctx.insert("cancel_url", cancel_url);
    render_page(state, "admin/confirm_delete.html", &ctx)
}
