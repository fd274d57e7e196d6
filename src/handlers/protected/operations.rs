// handlers/protected/operations.rs - /api/operations

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use super::super::parse_id;
use crate::app::AppState;
use crate::database::models::SiteOperation;
use crate::dto::{CreateOperationRequest, UpdateOperationRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::validation::ValidatedJson;

/// POST /api/operations
pub async fn operation_create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateOperationRequest>,
) -> ApiResult<SiteOperation> {
    let body = body.into_new_operation()?;
    if state.store.find_site(body.site_id).await?.is_none() {
        return Err(ApiError::not_found("Site not found"));
    }

    let operation = state.store.create_operation(body).await?;
    tracing::info!(
        operation_id = %operation.id,
        site_id = %operation.site_id,
        user_id = %auth_user.id,
        "Recorded site operation"
    );
    Ok(ApiResponse::created(operation))
}

/// GET /api/operations/site/:siteId
pub async fn operations_by_site(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> ApiResult<Vec<SiteOperation>> {
    let site_id = parse_id(&site_id, "Site")?;
    if state.store.find_site(site_id).await?.is_none() {
        return Err(ApiError::not_found("Site not found"));
    }

    let operations = state.store.operations_for_site(site_id).await?;
    Ok(ApiResponse::success(operations))
}

/// GET /api/operations/:id
pub async fn operation_get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SiteOperation> {
    let id = parse_id(&id, "Operation")?;
    let operation = state
        .store
        .find_operation(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Operation not found"))?;
    Ok(ApiResponse::success(operation))
}

/// PUT /api/operations/:id
pub async fn operation_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateOperationRequest>,
) -> ApiResult<SiteOperation> {
    let id = parse_id(&id, "Operation")?;
    let patch = body.into_patch()?;
    let operation = state
        .store
        .update_operation(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Operation not found"))?;
    Ok(ApiResponse::success(operation))
}

/// DELETE /api/operations/:id (ADMIN, MANAGER)
pub async fn operation_delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "Operation")?;
    if !state.store.delete_operation(id).await? {
        return Err(ApiError::not_found("Operation not found"));
    }
    Ok(ApiResponse::success(json!({ "message": "Operation deleted successfully" })))
}
