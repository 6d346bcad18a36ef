// User directory endpoints

use crate::{
    api::response::{ok, ApiJson, ApiPath, Envelope},
    auth::{AuthUser, MaybeAuthUser},
    directory::UserDirectory,
    domain::user::{
        parse_user_id, validate_email, validate_name, NewUser, User, UserChanges, UserSummary,
    },
    errors::{AppError, Result},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    #[serde(flatten)]
    pub user: UserSummary,
    pub owner_id: Option<i64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/users
#[tracing::instrument(skip(users))]
pub async fn list_users(
    State(users): State<Arc<UserDirectory>>,
) -> Json<Envelope<Vec<UserSummary>>> {
    let list = users.list().await;
    ok(list.iter().map(UserSummary::from).collect())
}

/// POST /api/users
///
/// The caller becomes the owner; anonymous callers are refused.
#[tracing::instrument(skip(users, req))]
pub async fn create_user(
    State(users): State<Arc<UserDirectory>>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<Envelope<CreatedUser>>)> {
    let name = validate_name(req.name.as_deref().unwrap_or_default())?;
    let email = validate_email(req.email.as_deref().unwrap_or_default())?;

    let caller =
        caller.ok_or_else(|| AppError::Forbidden("Authentication required".to_string()))?;

    let user = users
        .create(NewUser {
            name: Some(name),
            email,
            owner_id: Some(caller.id),
            password_hash: None,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ok(CreatedUser {
            user: UserSummary::from(&user),
            owner_id: user.owner_id,
        }),
    ))
}

/// GET /api/users/:id
#[tracing::instrument(skip(users))]
pub async fn get_user(
    State(users): State<Arc<UserDirectory>>,
    ApiPath(raw_id): ApiPath<String>,
) -> Result<Json<Envelope<UserSummary>>> {
    let id = parse_user_id(&raw_id)?;
    let user = users.get(id).await?;

    Ok(ok(UserSummary::from(&user)))
}

/// PUT /api/users/:id
///
/// Updates whichever of `name` / `email` is present.
#[tracing::instrument(skip(users, req))]
pub async fn update_user(
    State(users): State<Arc<UserDirectory>>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<Envelope<UserSummary>>> {
    let id = parse_user_id(&raw_id)?;

    let changes = UserChanges {
        name: req.name.as_deref().map(validate_name).transpose()?,
        email: req.email.as_deref().map(validate_email).transpose()?,
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update.".to_string()));
    }

    authorize(&users, caller, id).await?;
    let updated = users.update(id, changes).await?;

    Ok(ok(UserSummary::from(&updated)))
}

/// DELETE /api/users/:id
#[tracing::instrument(skip(users))]
pub async fn delete_user(
    State(users): State<Arc<UserDirectory>>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ApiPath(raw_id): ApiPath<String>,
) -> Result<StatusCode> {
    let id = parse_user_id(&raw_id)?;

    authorize(&users, caller, id).await?;
    users.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Admins may change anyone, other callers only entries they own
async fn authorize(users: &UserDirectory, caller: Option<AuthUser>, id: i64) -> Result<User> {
    let caller =
        caller.ok_or_else(|| AppError::Forbidden("Authentication required".to_string()))?;
    let user = users.get(id).await?;

    if !caller.can_manage(user.owner_id) {
        tracing::warn!(caller_id = %caller.id, user_id = %id, "Refused change to foreign user");
        return Err(AppError::Forbidden(
            "Not allowed to modify this user".to_string(),
        ));
    }

    Ok(user)
}
