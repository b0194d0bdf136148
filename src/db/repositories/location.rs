//! Location repository
//!
//! - `LocationRepository` trait
//! - `SqlxLocationRepository` implementing the trait on SQLite

use crate::db::DynDatabasePool;
use crate::models::{Location, LocationInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, input: &LocationInput) -> Result<Location>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location>;

    /// Delete a location; its posts keep existing without a location
    async fn delete(&self, id: i64) -> Result<()>;

    /// List all locations ordered by name
    async fn list(&self) -> Result<Vec<Location>>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &LocationInput) -> Result<Location> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.is_published)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create location")?;

        Ok(Location {
            id: result.last_insert_rowid(),
            name: input.name.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        let row = sqlx::query(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get location by ID")?;

        row.map(|row| row_to_location_sqlite(&row)).transpose()
    }

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location> {
        sqlx::query("UPDATE locations SET name = ?, is_published = ? WHERE id = ?")
            .bind(&input.name)
            .bind(input.is_published)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update location")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Location not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete location")?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Location>> {
        let rows = sqlx::query(
            "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id",
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list locations")?;

        rows.iter().map(row_to_location_sqlite).collect()
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM locations")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count locations")?;
        Ok(row.get("count"))
    }
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Location> {
    Ok(Location {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}
