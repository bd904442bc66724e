//! Caller identity middleware for mutating endpoints.
//!
//! The caller is named by the `X-User-Id` header. The middleware parses it
//! and injects the user ID into request extensions for downstream handlers.
//! Whether that user may perform the operation is decided by the managers.
//!
//! # Extracting the caller
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//!
//! async fn protected_handler(Extension(user_id): Extension<i64>) -> String {
//!     format!("Acting as user {}", user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tourney::users::UserId;

/// Header carrying the caller's user ID
pub const USER_ID_HEADER: &str = "x-user-id";

/// Parse the caller's ID from the header value
pub(crate) fn caller_from_headers(headers: &axum::http::HeaderMap) -> Option<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<UserId>().ok())
        .filter(|id| *id > 0)
}

/// Middleware that injects the caller's `UserId` into request extensions
///
/// - **Header present and numeric**: inserts `user_id: i64`, calls the next handler
/// - **Missing or malformed header**: returns `401 Unauthorized`
pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    match caller_from_headers(request.headers()) {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            Ok(next.run(request).await)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}
