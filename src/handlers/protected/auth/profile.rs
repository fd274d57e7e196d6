// handlers/protected/auth/profile.rs - GET /api/auth/profile

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// The caller's own record. A token can outlive its user, hence the 404.
pub async fn profile_get(State(state): State<AppState>, Extension(auth_user): Extension<AuthUser>) -> ApiResult<User> {
    let user = state
        .store
        .find_by_id(auth_user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(user))
}
