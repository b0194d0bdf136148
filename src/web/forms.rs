//! HTML form bindings
//!
//! Each form deserializes the urlencoded body as submitted (strings
//! throughout) so that an invalid submission can be rendered back unchanged.
//! `validate` turns it into typed service input or field-level errors.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CategoryInput, LocationInput, Post, PostInlineUpdate, PostInput, UpdateProfileInput, User};
use crate::services::post::TITLE_MAX_LEN;
use crate::services::user::{validate_email, validate_username};

/// Key for errors not tied to one field
pub const NON_FIELD_ERRORS: &str = "__all__";

const REQUIRED: &str = "Обязательное поле.";
const PASSWORD_MIN_LEN: usize = 8;

/// Accepted `pub_date` formats, as sent by `<input type="datetime-local">`
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Value of `pub_date` inputs
pub const DATETIME_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Field name to error messages
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(NON_FIELD_ERRORS, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn is_checked(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some(v) if !v.is_empty() && v != "false" && v != "0")
}

fn checkbox(on: bool) -> Option<String> {
    on.then(|| "on".to_string())
}

/// Parse an optional foreign key from a `<select>`; blank means none
fn parse_optional_id(raw: &str, field: &str, errors: &mut FormErrors) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, "Выберите корректный вариант.");
            None
        }
    }
}

fn id_value(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

/// Parse a `pub_date` value; blank means "now". Times are taken as UTC.
pub fn parse_pub_date(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(now);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| "Введите правильную дату и время.".to_string())
}

fn required(value: &str, field: &str, errors: &mut FormErrors) {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Create/edit post form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub location: String,
    pub category: String,
    pub is_published: Option<String>,
}

impl PostForm {
    /// Blank form: published, dated now
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            pub_date: now.format(DATETIME_INPUT_FORMAT).to_string(),
            is_published: checkbox(true),
            ..Self::default()
        }
    }

    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format(DATETIME_INPUT_FORMAT).to_string(),
            location: id_value(post.location_id),
            category: id_value(post.category_id),
            is_published: checkbox(post.is_published),
        }
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::default();

        required(&self.title, "title", &mut errors);
        if self.title.trim().chars().count() > TITLE_MAX_LEN {
            errors.add(
                "title",
                format!("Убедитесь, что это значение содержит не более {} символов.", TITLE_MAX_LEN),
            );
        }
        required(&self.text, "text", &mut errors);

        let pub_date = match parse_pub_date(&self.pub_date, now) {
            Ok(dt) => dt,
            Err(message) => {
                errors.add("pub_date", message);
                now
            }
        };
        let location_id = parse_optional_id(&self.location, "location", &mut errors);
        let category_id = parse_optional_id(&self.category, "category", &mut errors);

        errors.into_result(PostInput {
            title: self.title.trim().to_string(),
            text: self.text.trim().to_string(),
            pub_date,
            location_id,
            category_id,
            is_published: is_checked(&self.is_published),
        })
    }
}

/// One row of the back-office post list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostInlineForm {
    pub author: String,
    pub location: String,
    pub category: String,
    pub is_published: Option<String>,
}

impl PostInlineForm {
    pub fn validate(&self) -> Result<PostInlineUpdate, FormErrors> {
        let mut errors = FormErrors::default();
        let author_id = match self.author.trim().parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                errors.add("author", REQUIRED);
                0
            }
        };
        let location_id = parse_optional_id(&self.location, "location", &mut errors);
        let category_id = parse_optional_id(&self.category, "category", &mut errors);

        errors.into_result(PostInlineUpdate {
            author_id,
            location_id,
            category_id,
            is_published: is_checked(&self.is_published),
        })
    }
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        required(&self.text, "text", &mut errors);
        errors.into_result(self.text.trim().to_string())
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Edit-own-profile form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }

    pub fn validate(&self) -> Result<UpdateProfileInput, FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();
        if let Err(message) = validate_username(username) {
            errors.add("username", message);
        }
        if let Err(message) = validate_email(&self.email) {
            errors.add("email", message);
        }
        errors.into_result(UpdateProfileInput {
            username: username.to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        })
    }
}

/// Sign-up form. Passwords are never rendered back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl RegistrationForm {
    /// Field checks; returns (username, email, password)
    pub fn validate(&self) -> Result<(String, String, String), FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();
        if let Err(message) = validate_username(username) {
            errors.add("username", message);
        }
        if let Err(message) = validate_email(&self.email) {
            errors.add("email", message);
        }
        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if self.password1.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password1",
                format!(
                    "Введённый пароль слишком короткий. Он должен содержать как минимум {} символов.",
                    PASSWORD_MIN_LEN
                ),
            );
        }
        if self.password1 != self.password2 {
            errors.add("password2", "Введенные пароли не совпадают.");
        }
        errors.into_result((
            username.to_string(),
            self.email.trim().to_string(),
            self.password1.clone(),
        ))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Where to go after a successful login
    pub next: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        required(&self.username, "username", &mut errors);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(())
    }
}

/// Only local absolute paths are followed after login
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

// ============================================================================
// Back office
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: Option<String>,
}

impl CategoryForm {
    pub fn initial() -> Self {
        Self {
            is_published: checkbox(true),
            ..Self::default()
        }
    }

    pub fn from_category(category: &crate::models::Category) -> Self {
        Self {
            title: category.title.clone(),
            description: category.description.clone(),
            slug: category.slug.clone(),
            is_published: checkbox(category.is_published),
        }
    }

    pub fn validate(&self) -> Result<CategoryInput, FormErrors> {
        let mut errors = FormErrors::default();
        required(&self.title, "title", &mut errors);
        required(&self.slug, "slug", &mut errors);
        errors.into_result(CategoryInput {
            title: self.title.clone(),
            description: self.description.clone(),
            slug: self.slug.clone(),
            is_published: is_checked(&self.is_published),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationForm {
    pub name: String,
    pub is_published: Option<String>,
}

impl LocationForm {
    pub fn initial() -> Self {
        Self {
            is_published: checkbox(true),
            ..Self::default()
        }
    }

    pub fn from_location(location: &crate::models::Location) -> Self {
        Self {
            name: location.name.clone(),
            is_published: checkbox(location.is_published),
        }
    }

    pub fn validate(&self) -> Result<LocationInput, FormErrors> {
        let mut errors = FormErrors::default();
        required(&self.name, "name", &mut errors);
        errors.into_result(LocationInput {
            name: self.name.clone(),
            is_published: is_checked(&self.is_published),
        })
    }
}
