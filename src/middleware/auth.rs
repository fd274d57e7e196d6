use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{Claims, TokenService};
use crate::error::ApiError;
use crate::types::Role;

/// Identity resolved from a verified bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Bearer token gate. Verifies the token and stores the resolved
/// [`AuthUser`] in the request extensions for later stages.
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::warn!(path = %request.uri().path(), "Rejected request without bearer token");
        return Err(ApiError::unauthenticated("No token provided"));
    };

    let auth_user = tokens.verify(token).map_err(|kind| {
        tracing::warn!(path = %request.uri().path(), reason = %kind, "Rejected bearer token");
        ApiError::unauthenticated("Invalid token")
    })?;

    tracing::debug!(user_id = %auth_user.id, role = %auth_user.role, "Authenticated request");
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Token from `Authorization: Bearer <token>`, or `None` when absent or blank
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Extension, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new("middleware-test-signing-key", Duration::from_secs(3600)).unwrap())
    }

    fn app(tokens: Arc<TokenService>) -> Router {
        Router::new()
            .route("/me", get(|Extension(user): Extension<AuthUser>| async move { user.email }))
            .layer(from_fn_with_state(tokens, authenticate))
    }

    fn get_with(auth: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn extracts_bearer_tokens() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer    ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let response = app(tokens()).oneshot(get_with(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_token_is_401() {
        let response = app(tokens()).oneshot(get_with(Some("Bearer not-a-token"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_identity() {
        let tokens = tokens();
        let who = AuthUser {
            id: Uuid::new_v4(),
            email: "worker@asm.local".to_string(),
            role: Role::Worker,
        };
        let token = tokens.issue(&who).unwrap().token;

        let response = app(tokens)
            .oneshot(get_with(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"worker@asm.local");
    }
}
