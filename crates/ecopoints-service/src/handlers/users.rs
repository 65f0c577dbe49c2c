//! User management handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ecopoints_core::{User, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// User response.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Current points balance.
    pub points_balance: i64,
    /// Registration timestamp.
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            points_balance: user.points_balance,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Create user request.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Register a new user with a zero points balance.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".into()));
    }

    let user = User::new(UserId::generate(), body.name.trim(), body.email.trim());
    state.store.put_user(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(UserResponse::from(&user)))
}

/// Get a user's profile by id.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserResponse::from(&user)))
}

/// Deactivation response.
#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    /// User ID that was deactivated.
    pub id: String,
    /// Always true; deactivation either succeeds or errors.
    pub deactivated: bool,
}

/// Deactivate a user. Soft delete: the record and its history remain.
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<DeactivateResponse>, ApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    state.store.deactivate_user(&user_id).await?;

    tracing::info!(user_id = %user_id, "User deactivated");

    Ok(Json(DeactivateResponse {
        id: user_id.to_string(),
        deactivated: true,
    }))
}
