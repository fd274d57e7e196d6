use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::DocumentType;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub site_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub file_url: String,
    /// Bytes
    pub file_size: i64,
    pub file_type: String,
    pub doc_type: DocumentType,
    /// sha256, lowercase hex
    pub checksum: String,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row for an upload whose bytes are already in the object store
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Uuid,
    pub site_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub doc_type: DocumentType,
    pub checksum: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub file_name: Option<String>,
    pub doc_type: Option<DocumentType>,
}

impl DocumentPatch {
    pub fn apply(self, document: &mut Document) {
        if let Some(v) = self.file_name {
            document.file_name = v;
        }
        if let Some(v) = self.doc_type {
            document.doc_type = v;
        }
    }
}
