//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait on SQLite

use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Create a user who is staff only if the table was empty.
    ///
    /// The check and the insert are one statement, so two concurrent first
    /// registrations cannot both become staff.
    async fn create_first_as_staff(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Update profile fields (username, email, names) and the staff flag
    async fn update(&self, user: &User) -> Result<User>;

    /// Set or clear the staff flag
    async fn set_staff(&self, id: i64, is_staff: bool) -> Result<()>;

    /// Delete a user (cascades to posts, comments and sessions)
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// List users ordered by username
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>>;

    /// All users ordered by username
    async fn list_all(&self) -> Result<Vec<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        create_user_sqlite(self.pool.sqlite(), user).await
    }

    async fn create_first_as_staff(&self, user: &User) -> Result<User> {
        let pool = self.pool.sqlite();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff, date_joined)
            SELECT ?, ?, ?, ?, ?, NOT EXISTS (SELECT 1 FROM users), ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.date_joined)
        .execute(pool)
        .await
        .context("Failed to create user")?;

        get_user_by_id_sqlite(pool, result.last_insert_rowid())
            .await?
            .context("Created user not found")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        get_user_by_id_sqlite(self.pool.sqlite(), id).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        get_user_by_username_sqlite(self.pool.sqlite(), username).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        update_user_sqlite(self.pool.sqlite(), user).await
    }

    async fn set_staff(&self, id: i64, is_staff: bool) -> Result<()> {
        sqlx::query("UPDATE users SET is_staff = ? WHERE id = ?")
            .bind(is_staff)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update staff flag")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete user")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count users")?;
        Ok(row.get("count"))
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        list_users_sqlite(self.pool.sqlite(), offset, limit).await
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        list_users_sqlite(self.pool.sqlite(), 0, -1).await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, is_staff, date_joined";

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff, date_joined)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.date_joined)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let mut created = user.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, first_name = ?, last_name = ?, is_staff = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.is_staff)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn list_users_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users ORDER BY username LIMIT ? OFFSET ?",
        USER_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    rows.iter().map(row_to_user_sqlite).collect()
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        is_staff: row.try_get("is_staff")?,
        date_joined: row.try_get("date_joined")?,
    })
}
