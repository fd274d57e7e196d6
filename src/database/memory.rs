use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    Checklist, ChecklistItem, DashboardStats, Document, DocumentPatch, NewChecklist, NewDocument, NewOperation, NewSite,
    NewUser, OperationPatch, PageWindow, Site, SiteOperation, SitePatch, User,
};
use super::{
    utc_day, ChecklistStore, DatabaseError, DocumentStore, OperationStore, SiteStore, StatsStore, Store, UserStore,
};
use crate::types::{ChecklistStatus, OperationStatus, SiteStatus};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sites: HashMap<Uuid, Site>,
    operations: HashMap<Uuid, SiteOperation>,
    documents: HashMap<Uuid, Document>,
    checklists: HashMap<Uuid, Checklist>,
}

/// Process-local store with the same constraint behavior as the Postgres
/// schema: unique emails and checked references.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn page<T>(rows: Vec<T>, window: PageWindow) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
    let data = rows.into_iter().skip(offset).take(window.limit as usize).collect();
    (data, total)
}

fn missing(what: &str, id: Uuid) -> DatabaseError {
    DatabaseError::InvalidReference(format!("{} {} does not exist", what, id))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn list_sites(&self, manager_id: Option<Uuid>, window: PageWindow) -> Result<(Vec<Site>, u64), DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Site> = tables
            .sites
            .values()
            .filter(|s| manager_id.map_or(true, |m| s.manager_id == m))
            .cloned()
            .collect();
        newest_first(&mut rows, |s| (s.created_at, s.id));
        Ok(page(rows, window))
    }

    async fn find_site(&self, id: Uuid) -> Result<Option<Site>, DatabaseError> {
        Ok(self.tables.read().await.sites.get(&id).cloned())
    }

    async fn create_site(&self, site: NewSite) -> Result<Site, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&site.manager_id) {
            return Err(missing("Manager", site.manager_id));
        }

        let now = Utc::now();
        let row = Site {
            id: Uuid::new_v4(),
            name: site.name,
            location: site.location,
            address: site.address,
            postcode: site.postcode,
            start_date: site.start_date,
            end_date: site.end_date,
            status: site.status.unwrap_or_default(),
            manager_id: site.manager_id,
            created_at: now,
            updated_at: now,
        };
        tables.sites.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_site(&self, id: Uuid, patch: SitePatch) -> Result<Option<Site>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(manager_id) = patch.manager_id {
            if !tables.users.contains_key(&manager_id) {
                return Err(missing("Manager", manager_id));
            }
        }

        let Some(site) = tables.sites.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(site);
        site.updated_at = Utc::now();
        Ok(Some(site.clone()))
    }

    async fn delete_site(&self, id: Uuid) -> Result<Option<Vec<String>>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.sites.remove(&id).is_none() {
            return Ok(None);
        }

        tables.operations.retain(|_, op| op.site_id != id);
        tables.checklists.retain(|_, checklist| checklist.site_id != id);
        let mut keys = Vec::new();
        tables.documents.retain(|_, doc| {
            if doc.site_id == id {
                keys.push(doc.storage_key.clone());
                false
            } else {
                true
            }
        });
        Ok(Some(keys))
    }
}

#[async_trait]
impl OperationStore for MemoryStore {
    async fn operations_for_site(&self, site_id: Uuid) -> Result<Vec<SiteOperation>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<SiteOperation> =
            tables.operations.values().filter(|op| op.site_id == site_id).cloned().collect();
        newest_first(&mut rows, |op| (op.start_time, op.id));
        Ok(rows)
    }

    async fn find_operation(&self, id: Uuid) -> Result<Option<SiteOperation>, DatabaseError> {
        Ok(self.tables.read().await.operations.get(&id).cloned())
    }

    async fn create_operation(&self, operation: NewOperation) -> Result<SiteOperation, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.sites.contains_key(&operation.site_id) {
            return Err(missing("Site", operation.site_id));
        }
        if !tables.users.contains_key(&operation.recorded_by) {
            return Err(missing("User", operation.recorded_by));
        }

        let now = Utc::now();
        let row = SiteOperation {
            id: Uuid::new_v4(),
            site_id: operation.site_id,
            operation_type: operation.operation_type,
            description: operation.description,
            start_time: operation.start_time,
            end_time: operation.end_time,
            duration: operation.duration,
            workers_count: operation.workers_count,
            status: operation.status.unwrap_or_default(),
            recorded_by: operation.recorded_by,
            created_at: now,
            updated_at: now,
        };
        tables.operations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_operation(&self, id: Uuid, patch: OperationPatch) -> Result<Option<SiteOperation>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(operation) = tables.operations.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(operation);
        operation.updated_at = Utc::now();
        Ok(Some(operation.clone()))
    }

    async fn delete_operation(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.operations.remove(&id).is_some())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, site_id: Option<Uuid>, window: PageWindow) -> Result<(Vec<Document>, u64), DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Document> = tables
            .documents
            .values()
            .filter(|d| site_id.map_or(true, |s| d.site_id == s))
            .cloned()
            .collect();
        newest_first(&mut rows, |d| (d.created_at, d.id));
        Ok(page(rows, window))
    }

    async fn documents_for_site(&self, site_id: Uuid) -> Result<Vec<Document>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Document> = tables.documents.values().filter(|d| d.site_id == site_id).cloned().collect();
        newest_first(&mut rows, |d| (d.created_at, d.id));
        Ok(rows)
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        Ok(self.tables.read().await.documents.get(&id).cloned())
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.sites.contains_key(&document.site_id) {
            return Err(missing("Site", document.site_id));
        }
        if !tables.users.contains_key(&document.uploaded_by) {
            return Err(missing("User", document.uploaded_by));
        }
        if tables.documents.contains_key(&document.id) {
            return Err(DatabaseError::Conflict(format!("Document {} already exists", document.id)));
        }

        let now = Utc::now();
        let row = Document {
            id: document.id,
            site_id: document.site_id,
            uploaded_by: document.uploaded_by,
            file_name: document.file_name,
            file_url: document.file_url,
            file_size: document.file_size,
            file_type: document.file_type,
            doc_type: document.doc_type,
            checksum: document.checksum,
            storage_key: document.storage_key,
            created_at: now,
            updated_at: now,
        };
        tables.documents.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_document(&self, id: Uuid, patch: DocumentPatch) -> Result<Option<Document>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(document) = tables.documents.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(document);
        document.updated_at = Utc::now();
        Ok(Some(document.clone()))
    }

    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        Ok(self.tables.write().await.documents.remove(&id))
    }
}

#[async_trait]
impl ChecklistStore for MemoryStore {
    async fn list_checklists(&self) -> Result<Vec<Checklist>, DatabaseError> {
        let mut rows: Vec<Checklist> = self.tables.read().await.checklists.values().cloned().collect();
        newest_first(&mut rows, |c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn checklists_for_site(&self, site_id: Uuid) -> Result<Vec<Checklist>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Checklist> = tables.checklists.values().filter(|c| c.site_id == site_id).cloned().collect();
        newest_first(&mut rows, |c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn create_checklist(&self, checklist: NewChecklist) -> Result<Checklist, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.sites.contains_key(&checklist.site_id) {
            return Err(missing("Site", checklist.site_id));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let items = (0i32..)
            .zip(checklist.items)
            .map(|(position, item)| ChecklistItem {
                id: Uuid::new_v4(),
                checklist_id: id,
                position,
                description: item.description,
                completed: item.completed,
                completed_at: item.completed.then_some(now),
            })
            .collect();

        let row = Checklist {
            id,
            site_id: checklist.site_id,
            name: checklist.name,
            status: checklist.status.unwrap_or_default(),
            items,
            created_at: now,
            updated_at: now,
        };
        tables.checklists.insert(row.id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, DatabaseError> {
        let (day_start, day_end) = utc_day(now);
        let today = |t: DateTime<Utc>| t >= day_start && t < day_end;
        let tables = self.tables.read().await;
        let count = |n: usize| n as i64;

        Ok(DashboardStats {
            total_sites: count(tables.sites.len()),
            active_sites: count(tables.sites.values().filter(|s| s.status == SiteStatus::Active).count()),
            total_operations: count(tables.operations.len()),
            today_operations: count(tables.operations.values().filter(|op| today(op.start_time)).count()),
            completed_today: count(
                tables
                    .operations
                    .values()
                    .filter(|op| op.status == OperationStatus::Completed && today(op.end_time.unwrap_or(op.updated_at)))
                    .count(),
            ),
            active_workers: tables
                .operations
                .values()
                .filter(|op| op.status == OperationStatus::InProgress)
                .map(|op| i64::from(op.workers_count))
                .sum(),
            documents_uploaded: count(tables.documents.len()),
            pending_checklists: count(
                tables
                    .checklists
                    .values()
                    .filter(|c| c.status != ChecklistStatus::Completed)
                    .count(),
            ),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewChecklistItem;
    use crate::dto::PageRequest;
    use crate::types::Role;
    use chrono::Duration;

    async fn manager(store: &MemoryStore) -> User {
        store
            .create_user(NewUser {
                email: "manager@asm.local".to_string(),
                password_hash: "hash".to_string(),
                first_name: "Site".to_string(),
                last_name: "Manager".to_string(),
                role: Role::Manager,
            })
            .await
            .unwrap()
    }

    fn new_site(manager_id: Uuid, name: &str) -> NewSite {
        NewSite {
            name: name.to_string(),
            location: "Mid Suffolk".to_string(),
            address: "6 Yexley Road".to_string(),
            postcode: "IP14".to_string(),
            start_date: Utc::now(),
            end_date: None,
            status: None,
            manager_id,
        }
    }

    fn new_operation(site_id: Uuid, recorded_by: Uuid, status: OperationStatus, workers: i32) -> NewOperation {
        NewOperation {
            site_id,
            operation_type: "Removal".to_string(),
            description: "AIB strip-out".to_string(),
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            workers_count: workers,
            status: Some(status),
            recorded_by,
        }
    }

    fn new_checklist(site_id: Uuid, status: ChecklistStatus) -> NewChecklist {
        NewChecklist {
            site_id,
            name: "Enclosure Build Checklist".to_string(),
            status: Some(status),
            items: vec![
                NewChecklistItem {
                    description: "DCU positioned and connected".to_string(),
                    completed: true,
                },
                NewChecklistItem {
                    description: "Smoke test completed".to_string(),
                    completed: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let store = MemoryStore::new();
        manager(&store).await;
        let err = store
            .create_user(NewUser {
                email: "manager@asm.local".to_string(),
                password_hash: "other".to_string(),
                first_name: "Dup".to_string(),
                last_name: "User".to_string(),
                role: Role::Worker,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn sites_require_an_existing_manager() {
        let store = MemoryStore::new();
        let err = store.create_site(new_site(Uuid::new_v4(), "Orphan")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidReference(_)));

        let manager = manager(&store).await;
        let site = store.create_site(new_site(manager.id, "Depot")).await.unwrap();
        assert_eq!(site.status, SiteStatus::Planning);
    }

    #[tokio::test]
    async fn lists_are_paginated_and_filtered() {
        let store = MemoryStore::new();
        let manager = manager(&store).await;
        for n in 0..12 {
            store.create_site(new_site(manager.id, &format!("Site {}", n))).await.unwrap();
        }

        let (first, total) = store.list_sites(None, PageRequest::default().window()).await.unwrap();
        assert_eq!((first.len(), total), (10, 12));

        let (second, _) = store
            .list_sites(Some(manager.id), PageRequest { page: Some(2), limit: Some(10) }.window())
            .await
            .unwrap();
        assert_eq!(second.len(), 2);

        let (none, total) = store.list_sites(Some(Uuid::new_v4()), PageRequest::default().window()).await.unwrap();
        assert!(none.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn deleting_a_site_cascades() {
        let store = MemoryStore::new();
        let manager = manager(&store).await;
        let site = store.create_site(new_site(manager.id, "Basildon Voids")).await.unwrap();
        let op = store
            .create_operation(new_operation(site.id, manager.id, OperationStatus::Planned, 2))
            .await
            .unwrap();
        store
            .create_document(NewDocument {
                id: Uuid::new_v4(),
                site_id: site.id,
                uploaded_by: manager.id,
                file_name: "plan.pdf".to_string(),
                file_url: "/api/documents/x/download".to_string(),
                file_size: 3,
                file_type: "application/pdf".to_string(),
                doc_type: crate::types::DocumentType::SafetyPlan,
                checksum: "abc".to_string(),
                storage_key: "documents/site/plan.pdf".to_string(),
            })
            .await
            .unwrap();

        store.create_checklist(new_checklist(site.id, ChecklistStatus::Pending)).await.unwrap();

        let keys = store.delete_site(site.id).await.unwrap().unwrap();
        assert_eq!(keys, vec!["documents/site/plan.pdf".to_string()]);
        assert!(store.find_operation(op.id).await.unwrap().is_none());
        assert!(store.documents_for_site(site.id).await.unwrap().is_empty());
        assert!(store.list_checklists().await.unwrap().is_empty());
        assert!(store.delete_site(site.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dashboard_counts_today_and_workers() {
        let store = MemoryStore::new();
        let manager = manager(&store).await;
        let mut active = new_site(manager.id, "Active");
        active.status = Some(SiteStatus::Active);
        let site = store.create_site(active).await.unwrap();
        store.create_site(new_site(manager.id, "Planning")).await.unwrap();

        store
            .create_operation(new_operation(site.id, manager.id, OperationStatus::InProgress, 6))
            .await
            .unwrap();
        store
            .create_operation(new_operation(site.id, manager.id, OperationStatus::InProgress, 3))
            .await
            .unwrap();
        let mut old = new_operation(site.id, manager.id, OperationStatus::Completed, 4);
        old.start_time = Utc::now() - Duration::days(3);
        old.end_time = Some(Utc::now() - Duration::days(2));
        store.create_operation(old).await.unwrap();

        let stats = store.dashboard_stats(Utc::now()).await.unwrap();
        assert_eq!(stats.total_sites, 2);
        assert_eq!(stats.active_sites, 1);
        assert_eq!(stats.total_operations, 3);
        assert_eq!(stats.completed_today, 0);
        assert_eq!(stats.active_workers, 9);
        assert_eq!(stats.documents_uploaded, 0);
        assert_eq!(stats.pending_checklists, 0);
    }

    #[tokio::test]
    async fn checklists_keep_item_order_and_need_a_site() {
        let store = MemoryStore::new();
        let err = store
            .create_checklist(new_checklist(Uuid::new_v4(), ChecklistStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidReference(_)));

        let manager = manager(&store).await;
        let site = store.create_site(new_site(manager.id, "Yexley Road")).await.unwrap();
        let other = store.create_site(new_site(manager.id, "Basildon")).await.unwrap();
        let created = store.create_checklist(new_checklist(site.id, ChecklistStatus::InProgress)).await.unwrap();
        store.create_checklist(new_checklist(other.id, ChecklistStatus::Completed)).await.unwrap();

        assert_eq!(created.items[0].position, 0);
        assert!(created.items[0].completed_at.is_some());
        assert!(created.items[1].completed_at.is_none());

        let for_site = store.checklists_for_site(site.id).await.unwrap();
        assert_eq!(for_site.len(), 1);
        assert_eq!(for_site[0].items.len(), 2);
        assert_eq!(store.list_checklists().await.unwrap().len(), 2);
        assert_eq!(store.dashboard_stats(Utc::now()).await.unwrap().pending_checklists, 1);
    }

    #[tokio::test]
    async fn patch_can_clear_the_end_date() {
        let store = MemoryStore::new();
        let manager = manager(&store).await;
        let mut site = new_site(manager.id, "Temporary");
        site.end_date = Some(Utc::now());
        let site = store.create_site(site).await.unwrap();

        let kept = store
            .update_site(site.id, SitePatch { name: Some("Renamed".to_string()), ..Default::default() })
            .await
            .unwrap()
            .unwrap();
        assert!(kept.end_date.is_some());

        let cleared = store
            .update_site(site.id, SitePatch { end_date: Some(None), ..Default::default() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.end_date, None);
        assert_eq!(cleared.name, "Renamed");
    }
}
