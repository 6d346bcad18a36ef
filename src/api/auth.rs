// Credential registration endpoint

use crate::{
    api::response::{ok, ApiJson, Envelope},
    auth::password::{hash_password, MIN_PASSWORD_LENGTH},
    directory::UserDirectory,
    domain::user::{validate_email, validate_name, NewUser},
    errors::{AppError, Result},
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
///
/// Create a user with email and password
pub async fn register(
    State(users): State<Arc<UserDirectory>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<RegisteredUser>>)> {
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| AppError::BadRequest("email is required".to_string()))?;
    let email = validate_email(email)?;

    let password = req.password.unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let name = req.name.as_deref().map(validate_name).transpose()?;

    if users.find_by_email(&email).await.is_some() {
        tracing::info!("Registration refused for existing email");
        return Err(AppError::Conflict("email already exists".to_string()));
    }

    // Keep hashing off the async workers
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

    let user = users
        .create(NewUser {
            name,
            email,
            owner_id: None,
            password_hash: Some(password_hash),
        })
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        ok(RegisteredUser {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }),
    ))
}
