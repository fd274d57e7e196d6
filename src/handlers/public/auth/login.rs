// handlers/public/auth/login.rs - POST /api/auth/login

use axum::extract::State;

use super::AuthResponse;
use crate::app::AppState;
use crate::dto::LoginRequest;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::validation::ValidatedJson;

/// Same text for unknown email and wrong password
pub const LOGIN_FAILED: &str = "Invalid email or password";

pub async fn login_post(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let user = state.store.find_by_email(&body.email).await?;

    // Unknown emails still pay for a bcrypt comparison
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let matched = state.passwords.verify(body.password, stored_hash).await?;

    let Some(user) = user.filter(|_| matched) else {
        tracing::warn!("Failed login attempt");
        return Err(ApiError::unauthenticated(LOGIN_FAILED));
    };

    let issued = state.tokens.issue(&user.identity())?;
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(ApiResponse::success(AuthResponse {
        user,
        token: issued.token,
    }))
}
