//! Request bodies and query strings.
//!
//! Each form is checked as a whole by `validate()`. Only then is it turned
//! into the typed payload the stores take.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::database::models::{
    DocumentPatch, NewOperation, NewSite, OperationPatch, PageWindow, SitePatch, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use crate::error::{ApiError, FieldError};
use crate::types::{parse_iso8601, DocumentType};
use crate::validation::{checks, input, RequestForm};

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "input::email")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default, deserialize_with = "input::text")]
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(
            function = "checks::password_complexity",
            message = "Password must contain at least one uppercase letter, one lowercase letter, and one number"
        )
    )]
    pub password: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
}

impl RequestForm for RegisterRequest {
    const FIELDS: &'static [&'static str] = &["email", "password", "firstName", "lastName"];
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "input::email")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default, deserialize_with = "input::text")]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl RequestForm for LoginRequest {
    const FIELDS: &'static [&'static str] = &["email", "password"];
}

/// `?page=&limit=` query for list routes
#[derive(Debug, Clone, Copy, Default, Deserialize, Validate)]
pub struct PageRequest {
    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(range(min = 1, max = 4294967295, message = "Page must be a positive integer"))]
    pub page: Option<i64>,

    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

impl RequestForm for PageRequest {
    const FIELDS: &'static [&'static str] = &["page", "limit"];
}

impl PageRequest {
    pub fn window(&self) -> PageWindow {
        let bound = |value: Option<i64>, default: u32| value.and_then(|v| u32::try_from(v).ok()).unwrap_or(default);
        PageWindow {
            page: bound(self.page, DEFAULT_PAGE),
            limit: bound(self.limit, DEFAULT_LIMIT),
        }
    }
}

/// Create site request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteRequest {
    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "Site name is required"))]
    pub name: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "Postcode is required"))]
    pub postcode: String,

    #[serde(default, deserialize_with = "input::text")]
    #[validate(custom(function = "checks::iso8601", message = "Invalid start date"))]
    pub start_date: String,

    #[serde(default, deserialize_with = "input::optional_text")]
    #[validate(custom(function = "checks::iso8601", message = "Invalid end date"))]
    pub end_date: Option<String>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(custom(function = "checks::site_status", message = "Invalid site status"))]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(
        length(min = 1, message = "Manager ID is required"),
        custom(function = "checks::uuid", message = "Manager ID must be a valid ID")
    )]
    pub manager_id: String,
}

impl RequestForm for CreateSiteRequest {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "location",
        "address",
        "postcode",
        "startDate",
        "endDate",
        "status",
        "managerId",
    ];
}

impl CreateSiteRequest {
    pub fn into_new_site(self) -> Result<NewSite, ApiError> {
        Ok(NewSite {
            start_date: timestamp("startDate", &self.start_date)?,
            end_date: self.end_date.as_deref().map(|v| timestamp("endDate", v)).transpose()?,
            status: self.status.map(|v| named("status", v)).transpose()?,
            manager_id: id("managerId", &self.manager_id)?,
            name: self.name,
            location: self.location,
            address: self.address,
            postcode: self.postcode,
        })
    }
}

/// Update site request; absent fields keep their stored value and an
/// explicit `"endDate": null` clears the end date
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteRequest {
    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(length(min = 1, message = "Site name cannot be empty"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(length(min = 1, message = "Location cannot be empty"))]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(length(min = 1, message = "Address cannot be empty"))]
    pub address: Option<String>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(length(min = 1, message = "Postcode cannot be empty"))]
    pub postcode: Option<String>,

    #[serde(default, deserialize_with = "input::optional_text")]
    #[validate(custom(function = "checks::iso8601", message = "Invalid start date"))]
    pub start_date: Option<String>,

    #[serde(default, deserialize_with = "input::nullable_text")]
    #[validate(custom(function = "checks::iso8601", message = "Invalid end date"))]
    pub end_date: Option<Option<String>>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(custom(function = "checks::site_status", message = "Invalid site status"))]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(custom(function = "checks::uuid", message = "Manager ID must be a valid ID"))]
    pub manager_id: Option<String>,
}

impl RequestForm for UpdateSiteRequest {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "location",
        "address",
        "postcode",
        "startDate",
        "endDate",
        "status",
        "managerId",
    ];
}

impl UpdateSiteRequest {
    pub fn into_patch(self) -> Result<SitePatch, ApiError> {
        let end_date = match self.end_date {
            Some(Some(raw)) => Some(Some(timestamp("endDate", &raw)?)),
            Some(None) => Some(None),
            None => None,
        };

        Ok(SitePatch {
            name: self.name,
            location: self.location,
            address: self.address,
            postcode: self.postcode,
            start_date: self.start_date.as_deref().map(|v| timestamp("startDate", v)).transpose()?,
            end_date,
            status: self.status.map(|v| named("status", v)).transpose()?,
            manager_id: self.manager_id.as_deref().map(|v| id("managerId", v)).transpose()?,
        })
    }
}

/// Log operation request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOperationRequest {
    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(
        length(min = 1, message = "Site ID is required"),
        custom(function = "checks::uuid", message = "Site ID must be a valid ID")
    )]
    pub site_id: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "Operation type is required"))]
    pub operation_type: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(default, deserialize_with = "input::text")]
    #[validate(custom(function = "checks::iso8601", message = "Invalid start time"))]
    pub start_time: String,

    #[serde(default, deserialize_with = "input::optional_text")]
    #[validate(custom(function = "checks::iso8601", message = "Invalid end time"))]
    pub end_time: Option<String>,

    /// Minutes
    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(range(min = 0, max = 2147483647, message = "Duration must be a non-negative integer"))]
    pub duration: Option<i64>,

    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(
        required(message = "Workers count must be at least 1"),
        range(min = 1, max = 2147483647, message = "Workers count must be at least 1")
    )]
    pub workers_count: Option<i64>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(custom(function = "checks::operation_status", message = "Invalid operation status"))]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(
        length(min = 1, message = "Recorded by user ID is required"),
        custom(function = "checks::uuid", message = "Recorded by must be a valid user ID")
    )]
    pub recorded_by: String,
}

impl RequestForm for CreateOperationRequest {
    const FIELDS: &'static [&'static str] = &[
        "siteId",
        "operationType",
        "description",
        "startTime",
        "endTime",
        "duration",
        "workersCount",
        "status",
        "recordedBy",
    ];
}

impl CreateOperationRequest {
    pub fn into_new_operation(self) -> Result<NewOperation, ApiError> {
        Ok(NewOperation {
            site_id: id("siteId", &self.site_id)?,
            start_time: timestamp("startTime", &self.start_time)?,
            end_time: self.end_time.as_deref().map(|v| timestamp("endTime", v)).transpose()?,
            duration: self.duration.map(|v| small_int("duration", v)).transpose()?,
            workers_count: small_int("workersCount", self.workers_count.unwrap_or_default())?,
            status: self.status.map(|v| named("status", v)).transpose()?,
            recorded_by: id("recordedBy", &self.recorded_by)?,
            operation_type: self.operation_type,
            description: self.description,
        })
    }
}

/// Update operation request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOperationRequest {
    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(length(min = 1, message = "Operation type cannot be empty"))]
    pub operation_type: Option<String>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "input::optional_text")]
    #[validate(custom(function = "checks::iso8601", message = "Invalid end time"))]
    pub end_time: Option<String>,

    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(range(min = 0, max = 2147483647, message = "Duration must be a non-negative integer"))]
    pub duration: Option<i64>,

    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(range(min = 1, max = 2147483647, message = "Workers count must be at least 1"))]
    pub workers_count: Option<i64>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(custom(function = "checks::operation_status", message = "Invalid operation status"))]
    pub status: Option<String>,
}

impl RequestForm for UpdateOperationRequest {
    const FIELDS: &'static [&'static str] =
        &["operationType", "description", "endTime", "duration", "workersCount", "status"];
}

impl UpdateOperationRequest {
    pub fn into_patch(self) -> Result<OperationPatch, ApiError> {
        Ok(OperationPatch {
            operation_type: self.operation_type,
            description: self.description,
            end_time: self.end_time.as_deref().map(|v| timestamp("endTime", v)).transpose()?,
            duration: self.duration.map(|v| small_int("duration", v)).transpose()?,
            workers_count: self.workers_count.map(|v| small_int("workersCount", v)).transpose()?,
            status: self.status.map(|v| named("status", v)).transpose()?,
        })
    }
}

/// Text parts of the multipart upload form; the file part is checked by the handler
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentRequest {
    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(
        length(min = 1, message = "Site ID is required"),
        custom(function = "checks::uuid", message = "Site ID must be a valid ID")
    )]
    pub site_id: String,

    #[serde(default, deserialize_with = "input::trimmed")]
    #[validate(custom(function = "checks::document_type", message = "Invalid document type"))]
    pub doc_type: String,
}

impl RequestForm for UploadDocumentRequest {
    const FIELDS: &'static [&'static str] = &["siteId", "docType"];
}

impl UploadDocumentRequest {
    pub fn site_id(&self) -> Result<Uuid, ApiError> {
        id("siteId", &self.site_id)
    }

    pub fn doc_type(&self) -> Result<DocumentType, ApiError> {
        named("docType", self.doc_type.clone())
    }
}

/// Update document metadata request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(length(min = 1, message = "File name cannot be empty"))]
    pub file_name: Option<String>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(custom(function = "checks::document_type", message = "Invalid document type"))]
    pub doc_type: Option<String>,
}

impl RequestForm for UpdateDocumentRequest {
    const FIELDS: &'static [&'static str] = &["fileName", "docType"];
}

impl UpdateDocumentRequest {
    pub fn into_patch(self) -> Result<DocumentPatch, ApiError> {
        Ok(DocumentPatch {
            file_name: self.file_name,
            doc_type: self.doc_type.map(|v| named("docType", v)).transpose()?,
        })
    }
}

/// `GET /api/documents` query
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListQuery {
    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(range(min = 1, max = 4294967295, message = "Page must be a positive integer"))]
    pub page: Option<i64>,

    #[serde(default, deserialize_with = "input::optional_int")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[serde(default, deserialize_with = "input::optional_trimmed")]
    #[validate(custom(function = "checks::uuid", message = "Site ID must be a valid ID"))]
    pub site_id: Option<String>,
}

impl RequestForm for DocumentListQuery {
    const FIELDS: &'static [&'static str] = &["page", "limit", "siteId"];
}

impl DocumentListQuery {
    pub fn window(&self) -> PageWindow {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
        .window()
    }

    pub fn site_id(&self) -> Result<Option<Uuid>, ApiError> {
        self.site_id.as_deref().map(|v| id("siteId", v)).transpose()
    }
}

// Conversions below only fail on input that `validate()` already rejected

fn rejected(field: &str) -> ApiError {
    ApiError::ValidationFailed(vec![FieldError::new(field, "Invalid value")])
}

fn timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    parse_iso8601(raw).ok_or_else(|| rejected(field))
}

fn id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| rejected(field))
}

fn small_int(field: &str, value: i64) -> Result<i32, ApiError> {
    i32::try_from(value).map_err(|_| rejected(field))
}

/// Enum from its wire name
fn named<T: DeserializeOwned>(field: &str, raw: String) -> Result<T, ApiError> {
    serde_json::from_value(Value::String(raw)).map_err(|_| rejected(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationStatus, SiteStatus};
    use crate::validation::parse_validated;
    use serde_json::json;

    fn fields<T: std::fmt::Debug>(result: Result<T, ApiError>) -> Vec<String> {
        match result {
            Err(ApiError::ValidationFailed(errors)) => errors.into_iter().map(|FieldError { field, .. }| field).collect(),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn register_reports_each_problem() {
        let result = parse_validated::<RegisterRequest>(json!({ "email": "nope", "password": "short", "firstName": " " }));
        assert_eq!(fields(result), ["email", "password", "password", "firstName", "lastName"]);
    }

    #[test]
    fn register_sanitizes_a_complete_payload() {
        let request: RegisterRequest = parse_validated(json!({
            "email": " New.Worker@ASM.local ",
            "password": "Str0ngPass",
            "firstName": " Ada ",
            "lastName": "Byron",
        }))
        .unwrap();
        assert_eq!(request.email, "new.worker@asm.local");
        assert_eq!(request.first_name, "Ada");
    }

    #[test]
    fn create_site_requires_core_fields() {
        let result = parse_validated::<CreateSiteRequest>(json!({ "name": "Depot", "startDate": "yesterday" }));
        assert_eq!(fields(result), ["location", "address", "postcode", "startDate", "managerId", "managerId"]);
    }

    #[test]
    fn create_site_converts_to_typed_fields() {
        let manager_id = Uuid::new_v4();
        let request: CreateSiteRequest = parse_validated(json!({
            "name": " Depot ",
            "location": "Leeds",
            "address": "1 Example Street",
            "postcode": "LS1 1AA",
            "startDate": "2024-03-01",
            "status": "ACTIVE",
            "managerId": manager_id.to_string(),
        }))
        .unwrap();
        let site = request.into_new_site().unwrap();
        assert_eq!(site.name, "Depot");
        assert_eq!(site.status, Some(SiteStatus::Active));
        assert_eq!(site.manager_id, manager_id);
        assert_eq!(site.end_date, None);
    }

    #[test]
    fn update_site_allows_partial_payloads() {
        assert!(parse_validated::<UpdateSiteRequest>(json!({})).is_ok());
        assert!(parse_validated::<UpdateSiteRequest>(json!({ "status": "ACTIVE" })).is_ok());
        assert_eq!(fields(parse_validated::<UpdateSiteRequest>(json!({ "name": "  " }))), ["name"]);
        assert_eq!(fields(parse_validated::<UpdateSiteRequest>(json!({ "status": "active" }))), ["status"]);
        assert_eq!(fields(parse_validated::<UpdateSiteRequest>(json!({ "endDate": "soon" }))), ["endDate"]);
    }

    #[test]
    fn null_end_date_clears_it() {
        let patch = parse_validated::<UpdateSiteRequest>(json!({ "endDate": null }))
            .unwrap()
            .into_patch()
            .unwrap();
        assert_eq!(patch.end_date, Some(None));

        let patch = parse_validated::<UpdateSiteRequest>(json!({})).unwrap().into_patch().unwrap();
        assert_eq!(patch.end_date, None);
    }

    #[test]
    fn create_operation_needs_at_least_one_worker() {
        let mut payload = json!({
            "siteId": "7d3f0d56-7f8e-4d8a-9a55-0d6b0e1d2c3a",
            "operationType": "Excavation",
            "description": "North trench",
            "startTime": "2024-03-01T08:00:00Z",
            "workersCount": 0,
            "recordedBy": "5b8e0c1a-1111-4c2b-8d2e-9f0a1b2c3d4e",
        });
        assert_eq!(fields(parse_validated::<CreateOperationRequest>(payload.clone())), ["workersCount"]);

        payload.as_object_mut().unwrap().remove("workersCount");
        assert_eq!(fields(parse_validated::<CreateOperationRequest>(payload.clone())), ["workersCount"]);

        payload["workersCount"] = json!("3");
        payload["status"] = json!("IN_PROGRESS");
        let operation = parse_validated::<CreateOperationRequest>(payload)
            .unwrap()
            .into_new_operation()
            .unwrap();
        assert_eq!(operation.workers_count, 3);
        assert_eq!(operation.status, Some(OperationStatus::InProgress));
    }

    #[test]
    fn pagination_bounds() {
        assert!(parse_validated::<PageRequest>(json!({ "page": "1", "limit": "100" })).is_ok());
        assert_eq!(fields(parse_validated::<PageRequest>(json!({ "page": "0", "limit": "101" }))), ["page", "limit"]);
        assert_eq!(fields(parse_validated::<DocumentListQuery>(json!({ "siteId": "abc" }))), ["siteId"]);
    }

    #[test]
    fn pages_are_one_based() {
        let window = PageRequest { page: Some(3), limit: Some(20) }.window();
        assert_eq!(window.offset(), 40);
        assert_eq!(PageRequest::default().window(), PageWindow { page: 1, limit: 10 });
    }
}
