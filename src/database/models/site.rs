use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Checklist, Document, SiteOperation, User};
use crate::types::SiteStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub address: String,
    pub postcode: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: SiteStatus,
    pub manager_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A site with its manager, operation log, documents and checklists
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDetail {
    #[serde(flatten)]
    pub site: Site,
    pub manager: Option<User>,
    pub operations: Vec<SiteOperation>,
    pub documents: Vec<Document>,
    pub checklists: Vec<Checklist>,
}

#[derive(Debug, Clone)]
pub struct NewSite {
    pub name: String,
    pub location: String,
    pub address: String,
    pub postcode: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<SiteStatus>,
    pub manager_id: Uuid,
}

/// Partial update; `None` keeps the stored value. `end_date: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct SitePatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<SiteStatus>,
    pub manager_id: Option<Uuid>,
}

impl SitePatch {
    pub fn apply(self, site: &mut Site) {
        if let Some(v) = self.name {
            site.name = v;
        }
        if let Some(v) = self.location {
            site.location = v;
        }
        if let Some(v) = self.address {
            site.address = v;
        }
        if let Some(v) = self.postcode {
            site.postcode = v;
        }
        if let Some(v) = self.start_date {
            site.start_date = v;
        }
        if let Some(v) = self.end_date {
            site.end_date = v;
        }
        if let Some(v) = self.status {
            site.status = v;
        }
        if let Some(v) = self.manager_id {
            site.manager_id = v;
        }
    }
}
