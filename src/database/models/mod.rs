pub mod checklist;
pub mod document;
pub mod operation;
pub mod site;
pub mod user;

pub use checklist::{Checklist, ChecklistItem, NewChecklist, NewChecklistItem};
pub use document::{Document, DocumentPatch, NewDocument};
pub use operation::{NewOperation, OperationPatch, SiteOperation};
pub use site::{NewSite, Site, SiteDetail, SitePatch};
pub use user::{NewUser, User};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Resolved page position, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn paginate<T>(self, data: Vec<T>, total: u64) -> Paginated<T> {
        let total_pages = if self.limit == 0 { 0 } else { total.div_ceil(u64::from(self.limit)) };
        Paginated {
            data,
            pagination: Pagination {
                page: self.page,
                limit: self.limit,
                total,
                total_pages,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_sites: i64,
    pub active_sites: i64,
    pub total_operations: i64,
    pub today_operations: i64,
    pub completed_today: i64,
    /// Sum of `workersCount` over operations in progress
    pub active_workers: i64,
    pub documents_uploaded: i64,
    /// Checklists not yet COMPLETED
    pub pending_checklists: i64,
}
