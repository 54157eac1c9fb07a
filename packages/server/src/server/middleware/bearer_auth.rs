//! Shared-secret bearer authentication for the REST data plane.
//!
//! Every `/api/*` route requires `Authorization: Bearer <API_TOKEN>`.
//! Rejection happens before any business logic runs; `/health` is the
//! only unauthenticated route and is mounted outside this middleware.

use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

/// Bearer token middleware. `expected` is the configured shared secret.
pub async fn bearer_auth_middleware(
    expected: String,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !token_matches(&request, &expected) {
        debug!("Missing or invalid bearer token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Authentication required" })),
        )
            .into_response();
    }

    next.run(request).await
}

fn token_matches(request: &axum::http::Request<axum::body::Body>, expected: &str) -> bool {
    let Some(header) = request.headers().get("authorization") else {
        return false;
    };
    let Ok(value) = header.to_str() else {
        return false;
    };

    // Accept both "Bearer <token>" and a raw token
    let token = value.strip_prefix("Bearer ").unwrap_or(value);
    token == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_auth(value: Option<&str>) -> axum::http::Request<axum::body::Body> {
        let mut builder = axum::http::Request::builder();
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    }

    #[test]
    fn accepts_bearer_prefixed_token() {
        let request = request_with_auth(Some("Bearer sekrit"));
        assert!(token_matches(&request, "sekrit"));
    }

    #[test]
    fn accepts_raw_token() {
        let request = request_with_auth(Some("sekrit"));
        assert!(token_matches(&request, "sekrit"));
    }

    #[test]
    fn rejects_wrong_token() {
        let request = request_with_auth(Some("Bearer wrong"));
        assert!(!token_matches(&request, "sekrit"));
    }

    #[test]
    fn rejects_missing_header() {
        let request = request_with_auth(None);
        assert!(!token_matches(&request, "sekrit"));
    }
}
