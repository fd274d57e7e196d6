use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde_json::{Map, Value};

use super::{parse_validated, RequestForm};
use crate::error::ApiError;

/// JSON body that passed validation. An empty body validates as `{}`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: RequestForm,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        let raw: Value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|e| ApiError::bad_request(format!("Malformed JSON body: {}", e)))?
        };

        parse_validated(raw).map(ValidatedJson)
    }
}

/// Query string that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: RequestForm,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        let raw = Value::Object(params.into_iter().map(|(k, v)| (k, Value::String(v))).collect());
        parse_validated(raw).map(ValidatedQuery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::input;
    use axum::body::Body;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct Paging {
        #[serde(default, deserialize_with = "input::optional_int")]
        #[validate(range(min = 1, message = "Page must be a positive integer"))]
        page: Option<i64>,
    }

    impl RequestForm for Paging {
        const FIELDS: &'static [&'static str] = &["page"];
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[serde(default, deserialize_with = "input::trimmed")]
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    impl RequestForm for Named {
        const FIELDS: &'static [&'static str] = &["name"];
    }

    #[tokio::test]
    async fn query_values_are_coerced() {
        let mut parts = Request::builder().uri("/api/sites?page=3").body(()).unwrap().into_parts().0;
        let ValidatedQuery(paging) = ValidatedQuery::<Paging>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(paging.page, Some(3));

        let mut parts = Request::builder().uri("/api/sites?page=0").body(()).unwrap().into_parts().0;
        let err = ValidatedQuery::<Paging>::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(ref e) if e.len() == 1));
    }

    #[tokio::test]
    async fn json_body_is_trimmed() {
        let req = Request::builder().body(Body::from(r#"{"name":"  Dock 4 "}"#)).unwrap();
        let ValidatedJson(named) = ValidatedJson::<Named>::from_request(req, &()).await.unwrap();
        assert_eq!(named.name, "Dock 4");
    }

    #[tokio::test]
    async fn empty_body_reports_missing_fields() {
        let req = Request::builder().body(Body::empty()).unwrap();
        let err = ValidatedJson::<Named>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = Request::builder().body(Body::from("{name:")).unwrap();
        let err = ValidatedJson::<Named>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
