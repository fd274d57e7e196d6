use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::error::InternalErrorDetail;

/// Development only. Rewrites 500 bodies to include the internal error text.
pub async fn expose_internal_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>().cloned() else {
        return response;
    };

    let status = response.status();
    (
        status,
        Json(json!({
            "error": "Something went wrong!",
            "code": "INTERNAL_SERVER_ERROR",
            "detail": detail,
        })),
    )
        .into_response()
}
