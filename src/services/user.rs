//! User service
//!
//! Business logic for accounts and sessions:
//! - registration (the first account becomes staff)
//! - login and logout with server-side sessions
//! - session validation and periodic cleanup
//! - profile editing, restricted to the acting user
//! - staff management for the back office

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Page, PageRequest, Session, UpdateProfileInput, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 14;

/// Maximum username length
pub const USERNAME_MAX_LEN: usize = 150;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User not found
    #[error("User not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Check a username against the allowed length and characters.
///
/// Letters, digits and `@ . + - _` only, at most 150 characters.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Обязательное поле.".to_string());
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Убедитесь, что это значение содержит не более {} символов.",
            USERNAME_MAX_LEN
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_."
                .to_string(),
        );
    }
    Ok(())
}

/// Loose email check; an empty email is allowed
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(())
        }
        _ => Err("Введите правильный адрес электронной почты.".to_string()),
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Session lifetime in days
    pub fn session_expiration_days(&self) -> i64 {
        self.session_expiration_days
    }

    /// Register a new user.
    ///
    /// The first account in an empty database is made staff.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a bad username, email or empty password
    /// - `UserExists` if the username is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        validate_username(&input.username).map_err(UserServiceError::ValidationError)?;
        validate_email(&input.email).map_err(UserServiceError::ValidationError)?;
        if input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Пароль не может быть пустым.".to_string(),
            ));
        }

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(input.username));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.username, input.email.trim().to_string(), password_hash);

        let created = self
            .user_repo
            .create_first_as_staff(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, staff = created.is_staff, "User registered");
        Ok(created)
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError(
                "Пожалуйста, введите правильные имя пользователя и пароль.".to_string(),
            )
        };

        let user = self
            .user_repo
            .get_by_username(input.username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        let session = Session::new(user.id, self.session_expiration_days);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(created)
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for unknown or expired tokens; expired ones are removed.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?)
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?)
    }

    /// Update the acting user's own profile.
    ///
    /// There is no way to address another account: the target is always
    /// `user_id`, the authenticated identity.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        validate_username(&input.username).map_err(UserServiceError::ValidationError)?;
        validate_email(&input.email).map_err(UserServiceError::ValidationError)?;

        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound(user_id.to_string()))?;

        if input.username != user.username {
            if let Some(existing) = self
                .user_repo
                .get_by_username(&input.username)
                .await
                .context("Failed to check username")?
            {
                if existing.id != user_id {
                    return Err(UserServiceError::UserExists(input.username));
                }
            }
        }

        user.username = input.username;
        user.email = input.email.trim().to_string();
        user.first_name = input.first_name.trim().to_string();
        user.last_name = input.last_name.trim().to_string();

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;

        tracing::info!(user_id, "Profile updated");
        Ok(updated)
    }

    /// One page of users ordered by username
    pub async fn list(&self, page: &PageRequest) -> Result<Page<User>, UserServiceError> {
        let total = self.count().await?;
        let users = self
            .user_repo
            .list(page.offset(total), page.limit())
            .await
            .context("Failed to list users")?;
        Ok(Page::new(users, total, page))
    }

    /// All users ordered by username
    pub async fn list_all(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list_all().await.context("Failed to list users")?)
    }

    /// Count users
    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await.context("Failed to count users")?)
    }

    /// Grant or revoke back-office access
    pub async fn set_staff(&self, id: i64, is_staff: bool) -> Result<User, UserServiceError> {
        if self.get_by_id(id).await?.is_none() {
            return Err(UserServiceError::NotFound(id.to_string()));
        }
        self.user_repo
            .set_staff(id, is_staff)
            .await
            .context("Failed to update staff flag")?;

        tracing::info!(user_id = id, is_staff, "Staff flag changed");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(id.to_string()))
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
