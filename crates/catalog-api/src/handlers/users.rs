//! User listing handler
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthenticatedUser, UserPublic};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Extension, Json};
use std::sync::Arc;

/// Every identity, without password hashes
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "Users", body = [UserPublic]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<UserPublic>>, AppError> {
    let users = state
        .users
        .list()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    tracing::debug!(requested_by = user.user_id, count = users.len(), "listing users");
    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}
