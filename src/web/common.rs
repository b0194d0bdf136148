//! Extractors and query types shared by handlers

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::models::PageRequest;

use super::middleware::AppState;
use super::responses::AppError;

/// Route parameters; a value that does not parse (`/posts/abc/`) is a 404
#[derive(Debug, Clone)]
pub struct RoutePath<T>(pub T);

impl<T, S> FromRequestParts<S> for RoutePath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::NotFound(rejection.body_text())),
        }
    }
}

/// `?page=` as sent by the browser; anything unparsable selects page 1
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    /// Page request using the configured page size
    pub fn request(&self, state: &AppState) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), state.config.pagination.page_size)
    }
}

/// `?next=` on the login page
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}
