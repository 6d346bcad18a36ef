// User domain model and input validation

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MAX_NAME_LENGTH: usize = 100;

// ============================================================================
// Domain Types
// ============================================================================

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    /// Caller that created the entry, if any
    pub owner_id: Option<i64>,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Fields for a new entry, already validated
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub owner_id: Option<i64>,
    pub password_hash: Option<String>,
}

/// Partial update, already validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Escape angle brackets so stored names cannot carry markup
pub fn sanitize_input(input: &str) -> String {
    input.replace('<', "&lt;").replace('>', "&gt;")
}

/// Trimmed, 1 to 100 characters, markup escaped
pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    let length = name.chars().count();

    if length == 0 || length > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest("Invalid 'name'.".to_string()));
    }

    Ok(sanitize_input(name))
}

/// Trimmed and shaped like `local@domain.tld`
pub fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();

    if !looks_like_email(email) {
        return Err(AppError::BadRequest("Invalid 'email'.".to_string()));
    }

    Ok(email.to_string())
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Route ids are positive integers
pub fn parse_user_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("Invalid 'id'.".to_string()))
}
