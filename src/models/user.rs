//! User model
//!
//! Registered accounts. A user authors posts and comments, owns a public
//! profile keyed by username, and may be flagged as staff for the back office.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (may be empty)
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the user may enter the back office
    pub is_staff: bool,
    /// Registration timestamp
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            is_staff: false,
            date_joined: Utc::now(),
        }
    }

    /// "First Last", falling back to the username when both are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Gravatar URL derived from the email address
    pub fn avatar_url(&self) -> String {
        gravatar_url(&self.email)
    }
}

/// Generate a Gravatar URL from an email address
pub fn gravatar_url(email: &str) -> String {
    let email = email.trim();
    if email.is_empty() {
        return "https://www.gravatar.com/avatar/?d=mp&s=80".to_string();
    }
    let hash = format!("{:x}", md5::compute(email.to_lowercase()));
    format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
}

/// Input for registering a user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

/// Input for editing one's own profile
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}
