//! Persistence seams. Handlers only see the [`Store`] trait; the Postgres
//! and in-memory implementations live in their own modules.

pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use models::{
    Checklist, DashboardStats, Document, DocumentPatch, NewChecklist, NewDocument, NewOperation, NewSite, NewUser,
    OperationPatch, PageWindow, Site, SiteOperation, SitePatch, User,
};

/// Credential lookups
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    /// `Conflict` when the email is taken
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Newest first, optionally narrowed to one manager. Returns the page and the total count.
    async fn list_sites(&self, manager_id: Option<Uuid>, window: PageWindow) -> Result<(Vec<Site>, u64), DatabaseError>;
    async fn find_site(&self, id: Uuid) -> Result<Option<Site>, DatabaseError>;
    async fn create_site(&self, site: NewSite) -> Result<Site, DatabaseError>;
    async fn update_site(&self, id: Uuid, patch: SitePatch) -> Result<Option<Site>, DatabaseError>;
    /// Removes the site with its operations, documents and checklists. Returns the object
    /// storage keys of the removed documents, or `None` if there was no site.
    async fn delete_site(&self, id: Uuid) -> Result<Option<Vec<String>>, DatabaseError>;
}

#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn operations_for_site(&self, site_id: Uuid) -> Result<Vec<SiteOperation>, DatabaseError>;
    async fn find_operation(&self, id: Uuid) -> Result<Option<SiteOperation>, DatabaseError>;
    async fn create_operation(&self, operation: NewOperation) -> Result<SiteOperation, DatabaseError>;
    async fn update_operation(&self, id: Uuid, patch: OperationPatch) -> Result<Option<SiteOperation>, DatabaseError>;
    async fn delete_operation(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(&self, site_id: Option<Uuid>, window: PageWindow) -> Result<(Vec<Document>, u64), DatabaseError>;
    async fn documents_for_site(&self, site_id: Uuid) -> Result<Vec<Document>, DatabaseError>;
    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError>;
    async fn create_document(&self, document: NewDocument) -> Result<Document, DatabaseError>;
    async fn update_document(&self, id: Uuid, patch: DocumentPatch) -> Result<Option<Document>, DatabaseError>;
    /// Returns the removed row so its stored object can be deleted too
    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError>;
}

/// Checklists always come back with their items
#[async_trait]
pub trait ChecklistStore: Send + Sync {
    /// Newest first
    async fn list_checklists(&self) -> Result<Vec<Checklist>, DatabaseError>;
    async fn checklists_for_site(&self, site_id: Uuid) -> Result<Vec<Checklist>, DatabaseError>;
    /// `InvalidReference` when the site does not exist
    async fn create_checklist(&self, checklist: NewChecklist) -> Result<Checklist, DatabaseError>;
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Aggregates for the dashboard; "today" is the UTC calendar day of `now`
    async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, DatabaseError>;
}

#[async_trait]
pub trait Store: UserStore + SiteStore + OperationStore + DocumentStore + ChecklistStore + StatsStore {
    async fn health_check(&self) -> Result<(), DatabaseError>;
    async fn close(&self);
}

/// Bounds of the UTC day containing `now`
pub(crate) fn utc_day(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);
    (start, start + chrono::Duration::days(1))
}
