use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::ChecklistStatus;

/// A named list of tasks for one site
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: Uuid,
    pub site_id: Uuid,
    pub name: String,
    pub status: ChecklistStatus,
    /// Loaded separately, in position order
    #[sqlx(skip)]
    pub items: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Uuid,
    pub checklist_id: Uuid,
    pub position: i32,
    pub description: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewChecklist {
    pub site_id: Uuid,
    pub name: String,
    pub status: Option<ChecklistStatus>,
    pub items: Vec<NewChecklistItem>,
}

#[derive(Debug, Clone)]
pub struct NewChecklistItem {
    pub description: String,
    pub completed: bool,
}

/// Attach `items` to their checklists, keeping each list in position order
pub(crate) fn attach_items(checklists: &mut [Checklist], mut items: Vec<ChecklistItem>) {
    items.sort_by_key(|item| item.position);
    for item in items {
        if let Some(checklist) = checklists.iter_mut().find(|c| c.id == item.checklist_id) {
            checklist.items.push(item);
        }
    }
}
