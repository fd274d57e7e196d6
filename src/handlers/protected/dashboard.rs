// handlers/protected/dashboard.rs - GET /api/dashboard/stats

use axum::extract::State;
use chrono::Utc;

use crate::app::AppState;
use crate::database::models::DashboardStats;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn stats_get(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.store.dashboard_stats(Utc::now()).await?;
    Ok(ApiResponse::success(stats))
}
