//! Optional API key authentication
//!
//! When `ApiConfig::api_key` is set, every request except the health check
//! must carry a matching `X-Api-Key` header.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths reachable without a key
const PUBLIC_PATHS: &[&str] = &["/api/health"];

/// Reject requests whose `X-Api-Key` header does not match the configured key
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use leadflow::api::auth::require_api_key;
///
/// let router: Router = Router::new().layer(middleware::from_fn_with_state(
///     Some("secret-key-123".to_string()),
///     require_api_key,
/// ));
/// ```
pub async fn require_api_key(
    State(expected_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = expected_api_key else {
        return next.run(request).await;
    };

    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if constant_time_eq(key.as_bytes(), expected_key.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
            ApiError::unauthorized("Invalid API key").into_response()
        }
        None => ApiError::unauthorized("Missing X-Api-Key header").into_response(),
    }
}

/// Compares every byte so timing does not reveal the mismatch position
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    fn app(key: Option<&str>) -> Router {
        Router::new()
            .route("/api/campaigns", get(|| async { "campaigns" }))
            .route("/api/health", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                key.map(str::to_string),
                require_api_key,
            ))
    }

    async fn call(app: Router, uri: &str, key: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = key {
            builder = builder.header("X-Api-Key", key);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn open_when_no_key_configured() {
        let (status, _) = call(app(None), "/api/campaigns", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn matching_key_passes() {
        let (status, body) = call(app(Some("s3cret")), "/api/campaigns", Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "campaigns");
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let (status, body) = call(app(Some("s3cret")), "/api/campaigns", Some("S3CRET")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Invalid API key"));
        assert!(body.contains("\"code\":\"unauthorized\""));
    }

    #[tokio::test]
    async fn missing_key_is_rejected() {
        let (status, body) = call(app(Some("s3cret")), "/api/campaigns", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Missing X-Api-Key header"));
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, _) = call(app(Some("s3cret")), "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn comparison_is_exact() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc ", b"abc"));
    }
}
