//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A place a post can be tagged with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a location
#[derive(Debug, Clone)]
pub struct LocationInput {
    pub name: String,
    pub is_published: bool,
}
