//! Category listing page

use axum::{
    extract::{OriginalUri, Query, State},
    response::IntoResponse,
};

use super::common::{PageQuery, RoutePath};
use super::middleware::{AppState, Viewer};
use super::responses::{page_context, render, HandlerResult};

/// GET /category/{slug}/ - visible posts of a published category
pub async fn category_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    RoutePath(slug): RoutePath<String>,
    Query(query): Query<PageQuery>,
) -> HandlerResult {
    let (category, page) = state
        .post_service
        .list_by_category(&slug, &query.request(&state))
        .await?;

    let mut ctx = page_context(viewer.user(), uri.path());
    ctx.insert("category", &category);
    ctx.insert("page_obj", &page);
    Ok(render(&state, "blog/category.html", &ctx)?.into_response())
}
