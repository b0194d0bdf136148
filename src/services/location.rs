//! Location service

use crate::db::repositories::LocationRepository;
use crate::models::{Location, LocationInput};
use anyhow::Context;
use std::sync::Arc;

/// Maximum location name length
pub const LOCATION_NAME_MAX_LEN: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum LocationServiceError {
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: LocationInput) -> Result<Location, LocationServiceError> {
        let input = validate(input)?;
        let location = self
            .repo
            .create(&input)
            .await
            .context("Failed to create location")?;
        tracing::info!(location_id = location.id, "Location created");
        Ok(location)
    }

    pub async fn update(&self, id: i64, input: LocationInput) -> Result<Location, LocationServiceError> {
        let input = validate(input)?;
        self.require(id).await?;
        Ok(self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update location")?)
    }

    /// Delete a location; posts that referenced it keep existing
    pub async fn delete(&self, id: i64) -> Result<(), LocationServiceError> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete location")?;
        tracing::info!(location_id = id, "Location deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Location>, LocationServiceError> {
        Ok(self.repo.get_by_id(id).await.context("Failed to get location")?)
    }

    pub async fn list(&self) -> Result<Vec<Location>, LocationServiceError> {
        Ok(self.repo.list().await.context("Failed to list locations")?)
    }

    pub async fn count(&self) -> Result<i64, LocationServiceError> {
        Ok(self.repo.count().await.context("Failed to count locations")?)
    }

    async fn require(&self, id: i64) -> Result<Location, LocationServiceError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| LocationServiceError::NotFound(id.to_string()))
    }
}

fn validate(mut input: LocationInput) -> Result<LocationInput, LocationServiceError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(LocationServiceError::ValidationError(
            "Название места обязательно.".to_string(),
        ));
    }
    if input.name.chars().count() > LOCATION_NAME_MAX_LEN {
        return Err(LocationServiceError::ValidationError(format!(
            "Название места не может быть длиннее {} символов.",
            LOCATION_NAME_MAX_LEN
        )));
    }
    Ok(input)
}
