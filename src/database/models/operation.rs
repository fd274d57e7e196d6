use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::OperationStatus;

/// One entry in a site's operations log
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SiteOperation {
    pub id: Uuid,
    pub site_id: Uuid,
    pub operation_type: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Minutes
    pub duration: Option<i32>,
    pub workers_count: i32,
    pub status: OperationStatus,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOperation {
    pub site_id: Uuid,
    pub operation_type: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub workers_count: i32,
    pub status: Option<OperationStatus>,
    pub recorded_by: Uuid,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct OperationPatch {
    pub operation_type: Option<String>,
    pub description: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub workers_count: Option<i32>,
    pub status: Option<OperationStatus>,
}

impl OperationPatch {
    pub fn apply(self, operation: &mut SiteOperation) {
        if let Some(v) = self.operation_type {
            operation.operation_type = v;
        }
        if let Some(v) = self.description {
            operation.description = v;
        }
        if self.end_time.is_some() {
            operation.end_time = self.end_time;
        }
        if self.duration.is_some() {
            operation.duration = self.duration;
        }
        if let Some(v) = self.workers_count {
            operation.workers_count = v;
        }
        if let Some(v) = self.status {
            operation.status = v;
        }
    }
}
