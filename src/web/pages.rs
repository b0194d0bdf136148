//! Static informational pages

use axum::{
    extract::{OriginalUri, State},
    response::IntoResponse,
};

use super::middleware::{AppState, Viewer};
use super::responses::{page_context, render, HandlerResult};

/// GET /pages/about/
pub async fn about(State(state): State<AppState>, viewer: Viewer, OriginalUri(uri): OriginalUri) -> HandlerResult {
    let ctx = page_context(viewer.user(), uri.path());
    Ok(render(&state, "pages/about.html", &ctx)?.into_response())
}

/// GET /pages/rules/
pub async fn rules(State(state): State<AppState>, viewer: Viewer, OriginalUri(uri): OriginalUri) -> HandlerResult {
    let ctx = page_context(viewer.user(), uri.path());
    Ok(render(&state, "pages/rules.html", &ctx)?.into_response())
}
