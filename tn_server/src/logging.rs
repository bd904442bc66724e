//! Structured logging configuration.
//!
//! Library records emitted through the `log` facade are bridged into the
//! same subscriber, so manager and store messages share the request output.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use tn_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log API request/response
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
/// * `user_id` - Caller identity, when the request carried one
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    user_id: Option<i64>,
) {
    if status_code >= 500 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            user_id = user_id,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            user_id = user_id,
            "API request completed"
        );
    }
}
