//! Request ID middleware for tracing and debugging.
//!
//! Every request carries an ID, taken from the `x-request-id` header or
//! generated, which is echoed on the response. Handlers run inside a
//! `request` span carrying the ID, so their tracing events are tagged with it.

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::identity::caller_from_headers;
use crate::logging::log_api_request;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate or extract request ID from headers
fn get_or_generate_request_id(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Middleware to add request ID to all requests and responses
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use tn_server::api::request_id::request_id_middleware;
///
/// # async fn example() {
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// # }
/// ```
pub async fn request_id_middleware(
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let started = Instant::now();
    let request_id = get_or_generate_request_id(request.headers());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let user_id = caller_from_headers(request.headers());

    let span = tracing::info_span!("request", request_id = %request_id);
    span.in_scope(|| {
        tracing::debug!(method = %method, uri = %request.uri(), "Request started");
    });

    let response = next.run(request).instrument(span).await;

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    log_api_request(
        &method,
        &path,
        parts.status.as_u16(),
        started.elapsed().as_millis() as u64,
        user_id,
    );

    Ok(Response::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderMap;

    #[test]
    fn test_get_or_generate_request_id_with_existing() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("test-id-123"));

        let request_id = get_or_generate_request_id(&headers);
        assert_eq!(request_id, "test-id-123");
    }

    #[test]
    fn test_get_or_generate_request_id_generates_new() {
        let headers = HeaderMap::new();
        let request_id = get_or_generate_request_id(&headers);

        // Should be a valid UUID
        assert!(Uuid::parse_str(&request_id).is_ok());
    }
}
