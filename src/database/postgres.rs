use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    checklist::attach_items, Checklist, ChecklistItem, DashboardStats, Document, DocumentPatch, NewChecklist,
    NewDocument, NewOperation, NewSite, NewUser, OperationPatch, PageWindow, Site, SiteOperation, SitePatch, User,
};
use super::{
    utc_day, ChecklistStore, DatabaseError, DatabaseManager, DocumentStore, OperationStore, SiteStore, StatsStore, Store,
    UserStore,
};

/// [`Store`] over the shared Postgres pool
#[derive(Clone)]
pub struct PgStore {
    db: DatabaseManager,
}

impl PgStore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub fn manager(&self) -> &DatabaseManager {
        &self.db
    }
}

fn limit_offset(window: PageWindow) -> (i64, i64) {
    (
        i64::from(window.limit),
        i64::try_from(window.offset()).unwrap_or(i64::MAX),
    )
}

fn count(total: i64) -> u64 {
    u64::try_from(total).unwrap_or(0)
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Conflict(_) => DatabaseError::Conflict("User already exists".to_string()),
            other => other,
        })?;
        Ok(created)
    }
}

#[async_trait]
impl SiteStore for PgStore {
    async fn list_sites(&self, manager_id: Option<Uuid>, window: PageWindow) -> Result<(Vec<Site>, u64), DatabaseError> {
        let (limit, offset) = limit_offset(window);
        let sites = sqlx::query_as::<_, Site>(
            "SELECT * FROM sites
             WHERE ($1::uuid IS NULL OR manager_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(manager_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sites WHERE ($1::uuid IS NULL OR manager_id = $1)")
            .bind(manager_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok((sites, count(total)))
    }

    async fn find_site(&self, id: Uuid) -> Result<Option<Site>, DatabaseError> {
        let site = sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(site)
    }

    async fn create_site(&self, site: NewSite) -> Result<Site, DatabaseError> {
        let created = sqlx::query_as::<_, Site>(
            "INSERT INTO sites (name, location, address, postcode, start_date, end_date, status, manager_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(&site.name)
        .bind(&site.location)
        .bind(&site.address)
        .bind(&site.postcode)
        .bind(site.start_date)
        .bind(site.end_date)
        .bind(site.status.unwrap_or_default())
        .bind(site.manager_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(created)
    }

    async fn update_site(&self, id: Uuid, patch: SitePatch) -> Result<Option<Site>, DatabaseError> {
        let updated = sqlx::query_as::<_, Site>(
            "UPDATE sites SET
                name = COALESCE($2, name),
                location = COALESCE($3, location),
                address = COALESCE($4, address),
                postcode = COALESCE($5, postcode),
                start_date = COALESCE($6, start_date),
                end_date = CASE WHEN $7 THEN $8 ELSE end_date END,
                status = COALESCE($9, status),
                manager_id = COALESCE($10, manager_id),
                updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.location)
        .bind(patch.address)
        .bind(patch.postcode)
        .bind(patch.start_date)
        .bind(patch.end_date.is_some())
        .bind(patch.end_date.flatten())
        .bind(patch.status)
        .bind(patch.manager_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(updated)
    }

    async fn delete_site(&self, id: Uuid) -> Result<Option<Vec<String>>, DatabaseError> {
        let mut tx = self.db.pool().begin().await?;

        let keys: Vec<String> = sqlx::query_scalar("SELECT storage_key FROM documents WHERE site_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        // operations, documents and checklists go with the site via ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok((deleted > 0).then_some(keys))
    }
}

#[async_trait]
impl OperationStore for PgStore {
    async fn operations_for_site(&self, site_id: Uuid) -> Result<Vec<SiteOperation>, DatabaseError> {
        let operations = sqlx::query_as::<_, SiteOperation>(
            "SELECT * FROM site_operations WHERE site_id = $1 ORDER BY start_time DESC, id DESC",
        )
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(operations)
    }

    async fn find_operation(&self, id: Uuid) -> Result<Option<SiteOperation>, DatabaseError> {
        let operation = sqlx::query_as::<_, SiteOperation>("SELECT * FROM site_operations WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(operation)
    }

    async fn create_operation(&self, operation: NewOperation) -> Result<SiteOperation, DatabaseError> {
        let created = sqlx::query_as::<_, SiteOperation>(
            "INSERT INTO site_operations
                (site_id, operation_type, description, start_time, end_time, duration, workers_count, status, recorded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(operation.site_id)
        .bind(&operation.operation_type)
        .bind(&operation.description)
        .bind(operation.start_time)
        .bind(operation.end_time)
        .bind(operation.duration)
        .bind(operation.workers_count)
        .bind(operation.status.unwrap_or_default())
        .bind(operation.recorded_by)
        .fetch_one(self.db.pool())
        .await?;
        Ok(created)
    }

    async fn update_operation(&self, id: Uuid, patch: OperationPatch) -> Result<Option<SiteOperation>, DatabaseError> {
        let updated = sqlx::query_as::<_, SiteOperation>(
            "UPDATE site_operations SET
                operation_type = COALESCE($2, operation_type),
                description = COALESCE($3, description),
                end_time = COALESCE($4, end_time),
                duration = COALESCE($5, duration),
                workers_count = COALESCE($6, workers_count),
                status = COALESCE($7, status),
                updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(patch.operation_type)
        .bind(patch.description)
        .bind(patch.end_time)
        .bind(patch.duration)
        .bind(patch.workers_count)
        .bind(patch.status)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(updated)
    }

    async fn delete_operation(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM site_operations WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn list_documents(&self, site_id: Option<Uuid>, window: PageWindow) -> Result<(Vec<Document>, u64), DatabaseError> {
        let (limit, offset) = limit_offset(window);
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents
             WHERE ($1::uuid IS NULL OR site_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(site_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE ($1::uuid IS NULL OR site_id = $1)")
            .bind(site_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok((documents, count(total)))
    }

    async fn documents_for_site(&self, site_id: Uuid) -> Result<Vec<Document>, DatabaseError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE site_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(documents)
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let document = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(document)
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document, DatabaseError> {
        let created = sqlx::query_as::<_, Document>(
            "INSERT INTO documents
                (id, site_id, uploaded_by, file_name, file_url, file_size, file_type, doc_type, checksum, storage_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(document.id)
        .bind(document.site_id)
        .bind(document.uploaded_by)
        .bind(&document.file_name)
        .bind(&document.file_url)
        .bind(document.file_size)
        .bind(&document.file_type)
        .bind(document.doc_type)
        .bind(&document.checksum)
        .bind(&document.storage_key)
        .fetch_one(self.db.pool())
        .await?;
        Ok(created)
    }

    async fn update_document(&self, id: Uuid, patch: DocumentPatch) -> Result<Option<Document>, DatabaseError> {
        let updated = sqlx::query_as::<_, Document>(
            "UPDATE documents SET
                file_name = COALESCE($2, file_name),
                doc_type = COALESCE($3, doc_type),
                updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(patch.file_name)
        .bind(patch.doc_type)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(updated)
    }

    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let deleted = sqlx::query_as::<_, Document>("DELETE FROM documents WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(deleted)
    }
}

impl PgStore {
    async fn with_items(&self, mut checklists: Vec<Checklist>) -> Result<Vec<Checklist>, DatabaseError> {
        if checklists.is_empty() {
            return Ok(checklists);
        }
        let ids: Vec<Uuid> = checklists.iter().map(|c| c.id).collect();
        let items = sqlx::query_as::<_, ChecklistItem>(
            "SELECT * FROM checklist_items WHERE checklist_id = ANY($1) ORDER BY position",
        )
        .bind(ids)
        .fetch_all(self.db.pool())
        .await?;
        attach_items(&mut checklists, items);
        Ok(checklists)
    }
}

#[async_trait]
impl ChecklistStore for PgStore {
    async fn list_checklists(&self) -> Result<Vec<Checklist>, DatabaseError> {
        let checklists = sqlx::query_as::<_, Checklist>("SELECT * FROM checklists ORDER BY created_at DESC, id DESC")
            .fetch_all(self.db.pool())
            .await?;
        self.with_items(checklists).await
    }

    async fn checklists_for_site(&self, site_id: Uuid) -> Result<Vec<Checklist>, DatabaseError> {
        let checklists = sqlx::query_as::<_, Checklist>(
            "SELECT * FROM checklists WHERE site_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        self.with_items(checklists).await
    }

    async fn create_checklist(&self, checklist: NewChecklist) -> Result<Checklist, DatabaseError> {
        let mut tx = self.db.pool().begin().await?;

        let mut created = sqlx::query_as::<_, Checklist>(
            "INSERT INTO checklists (site_id, name, status) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(checklist.site_id)
        .bind(&checklist.name)
        .bind(checklist.status.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in (0i32..).zip(checklist.items) {
            let row = sqlx::query_as::<_, ChecklistItem>(
                "INSERT INTO checklist_items (checklist_id, position, description, completed, completed_at)
                 VALUES ($1, $2, $3, $4, CASE WHEN $4 THEN now() END)
                 RETURNING *",
            )
            .bind(created.id)
            .bind(position)
            .bind(&item.description)
            .bind(item.completed)
            .fetch_one(&mut *tx)
            .await?;
            created.items.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }
}

#[async_trait]
impl StatsStore for PgStore {
    async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, DatabaseError> {
        let (day_start, day_end) = utc_day(now);
        let stats = sqlx::query_as::<_, DashboardStats>(
            "SELECT
                (SELECT COUNT(*) FROM sites) AS total_sites,
                (SELECT COUNT(*) FROM sites WHERE status = 'ACTIVE') AS active_sites,
                (SELECT COUNT(*) FROM site_operations) AS total_operations,
                (SELECT COUNT(*) FROM site_operations
                    WHERE start_time >= $1 AND start_time < $2) AS today_operations,
                (SELECT COUNT(*) FROM site_operations
                    WHERE status = 'COMPLETED'
                      AND COALESCE(end_time, updated_at) >= $1
                      AND COALESCE(end_time, updated_at) < $2) AS completed_today,
                (SELECT COALESCE(SUM(workers_count), 0)::BIGINT FROM site_operations
                    WHERE status = 'IN_PROGRESS') AS active_workers,
                (SELECT COUNT(*) FROM documents) AS documents_uploaded,
                (SELECT COUNT(*) FROM checklists WHERE status <> 'COMPLETED') AS pending_checklists",
        )
        .bind(day_start)
        .bind(day_end)
        .fetch_one(self.db.pool())
        .await?;
        Ok(stats)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.db.health_check().await
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
