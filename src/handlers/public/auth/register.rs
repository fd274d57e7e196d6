// handlers/public/auth/register.rs - POST /api/auth/register

use axum::extract::State;

use super::AuthResponse;
use crate::app::AppState;
use crate::database::models::NewUser;
use crate::dto::RegisterRequest;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Role;
use crate::validation::ValidatedJson;

/// Self-service accounts always start as WORKER; roles change only through
/// the `create-user` admin command or direct database access.
pub async fn register_post(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    if state.store.find_by_email(&body.email).await?.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let password_hash = state.passwords.hash(body.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            email: body.email,
            password_hash,
            first_name: body.first_name,
            last_name: body.last_name,
            role: Role::Worker,
        })
        .await?;

    let issued = state.tokens.issue(&user.identity())?;
    tracing::info!(user_id = %user.id, "Registered new user");

    Ok(ApiResponse::created(AuthResponse {
        user,
        token: issued.token,
    }))
}
