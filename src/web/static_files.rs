//! Embedded static assets under `/static/`

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

use super::responses::AppError;

#[derive(RustEmbed)]
#[folder = "static/"]
#[include = "*"]
struct StaticAssets;

/// GET /static/{*path}
pub async fn serve_static(Path(path): Path<String>) -> Response {
    let decoded = urlencoding::decode(&path).map(|p| p.into_owned()).unwrap_or(path);
    let asset_path = decoded.trim_start_matches('/');

    match StaticAssets::get(asset_path) {
        Some(content) => build_response(asset_path, content.data.into_owned()),
        None => AppError::NotFound(format!("static file '{}'", asset_path)).into_response(),
    }
}

fn build_response(path: &str, data: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, get_content_type(path)),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    )
        .into_response()
}

/// Get content type from file extension
fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
