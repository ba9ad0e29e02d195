//! User management.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use hearth_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::state::AppState;

/// Partial user update. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<UserRole>,
    pub name: Option<String>,
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<User>>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(users))
}

/// Change a user's role or name. Admins cannot demote themselves.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    if id == admin.id && req.role.is_some_and(|r| !r.is_admin()) {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }

    let name = req.name.as_deref().map(str::trim);
    if name.is_some_and(|n| n.chars().count() > 100) {
        return Err(AppError::BadRequest(
            "name must be at most 100 characters".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .update(id, req.role, name)
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User updated");
    Ok(Json(user))
}

/// Delete a user. Admins cannot delete themselves.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    UserRepository::new(state.pool()).delete(id).await?;

    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
