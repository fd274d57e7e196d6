// handlers/protected/documents.rs - /api/documents

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::super::parse_id;
use crate::app::AppState;
use crate::database::models::{Document, NewDocument, Paginated};
use crate::dto::{DocumentListQuery, UpdateDocumentRequest, UploadDocumentRequest};
use crate::error::{ApiError, FieldError};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::storage::{checksum, document_key, is_allowed_content_type};
use crate::validation::{parse_validated, ValidatedJson, ValidatedQuery};

const FILE_FIELD: &str = "file";
const INVALID_FILE_TYPE: &str = "Invalid file type. Only PDF, images, and office documents are allowed.";

/// GET /api/documents, optionally narrowed with `?siteId=`
pub async fn documents_list(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<DocumentListQuery>,
) -> ApiResult<Paginated<Document>> {
    let window = query.window();
    let (documents, total) = state.store.list_documents(query.site_id()?, window).await?;
    Ok(ApiResponse::success(window.paginate(documents, total)))
}

/// GET /api/documents/:id
pub async fn document_get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let document = find(&state, &id).await?;
    Ok(ApiResponse::success(document))
}

/// GET /api/documents/:id/download
pub async fn document_download(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let document = find(&state, &id).await?;
    let bytes = state.objects.get(&document.storage_key).await?;

    let content_type =
        HeaderValue::from_str(&document.file_type).unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", document.file_name.replace('"', "")))
        .unwrap_or(HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    )
        .into_response())
}

struct UploadedFile {
    name: String,
    content_type: String,
    bytes: Bytes,
}

/// POST /api/documents, multipart form with `file`, `siteId` and `docType`
pub async fn document_upload(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<Document> {
    let max_bytes = state.config.storage.max_upload_bytes;
    let mut fields = Map::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, max_bytes))? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            if !is_allowed_content_type(&content_type) {
                return Err(ApiError::UnsupportedMediaType(INVALID_FILE_TYPE.to_string()));
            }
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;
            if bytes.len() > max_bytes {
                return Err(too_large(max_bytes));
            }
            file = Some(UploadedFile {
                name: file_name,
                content_type,
                bytes,
            });
        } else if !name.is_empty() {
            let text = field.text().await.map_err(|e| multipart_error(e, max_bytes))?;
            fields.insert(name, Value::String(text));
        }
    }

    // Report form field problems and a missing file together
    let (form, mut errors) = match parse_validated::<UploadDocumentRequest>(Value::Object(fields)) {
        Ok(form) => (Some(form), Vec::new()),
        Err(ApiError::ValidationFailed(errors)) => (None, errors),
        Err(other) => return Err(other),
    };
    if file.is_none() {
        errors.push(FieldError::new(FILE_FIELD, "File is required"));
    }
    let (Some(form), Some(file)) = (form, file) else {
        return Err(ApiError::ValidationFailed(errors));
    };
    let site_id = form.site_id()?;
    let doc_type = form.doc_type()?;

    if state.store.find_site(site_id).await?.is_none() {
        return Err(ApiError::not_found("Site not found"));
    }

    let id = Uuid::new_v4();
    let storage_key = document_key(site_id, id, &file.name);
    let file_size = i64::try_from(file.bytes.len()).map_err(|_| too_large(max_bytes))?;
    let digest = checksum(&file.bytes);

    state.objects.put(&storage_key, file.bytes).await?;

    let created = state
        .store
        .create_document(NewDocument {
            id,
            site_id,
            uploaded_by: auth_user.id,
            file_name: file.name,
            file_url: format!("/api/documents/{}/download", id),
            file_size,
            file_type: file.content_type,
            doc_type,
            checksum: digest,
            storage_key: storage_key.clone(),
        })
        .await;

    let document = match created {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = state.objects.delete(&storage_key).await {
                tracing::warn!(key = %storage_key, error = %cleanup, "Failed to remove object after insert error");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        document_id = %document.id,
        site_id = %document.site_id,
        size = document.file_size,
        "Stored document"
    );
    Ok(ApiResponse::created(document))
}

/// PUT /api/documents/:id, metadata only
pub async fn document_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateDocumentRequest>,
) -> ApiResult<Document> {
    let id = parse_id(&id, "Document")?;
    let patch = body.into_patch()?;
    let document = state
        .store
        .update_document(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;
    Ok(ApiResponse::success(document))
}

/// DELETE /api/documents/:id (ADMIN, MANAGER)
pub async fn document_delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "Document")?;
    let document = state
        .store
        .delete_document(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    if let Err(e) = state.objects.delete(&document.storage_key).await {
        tracing::warn!(key = %document.storage_key, error = %e, "Failed to delete stored document");
    }

    Ok(ApiResponse::success(json!({ "message": "Document deleted successfully" })))
}

async fn find(state: &AppState, raw_id: &str) -> Result<Document, ApiError> {
    let id = parse_id(raw_id, "Document")?;
    state
        .store
        .find_document(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!("File exceeds the {} byte upload limit", max_bytes))
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::bad_request(err.body_text())
    }
}
