// handlers/protected/checklists.rs - GET /api/checklists

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::Checklist;
use crate::middleware::{ApiResponse, ApiResult};

/// Every checklist with its items, newest first
pub async fn checklists_list(State(state): State<AppState>) -> ApiResult<Vec<Checklist>> {
    let checklists = state.store.list_checklists().await?;
    Ok(ApiResponse::success(checklists))
}
