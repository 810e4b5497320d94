//! Mapping handler failures to HTTP statuses.
//!
//! Every failure is logged once, where it is turned into a status, with the
//! handler's context attached as a field so request logs can be grouped by it.

use axum::http::StatusCode;
use tracing::Level;

/// Log level for a failure answered with `status`: server faults are errors,
/// client mistakes are warnings.
pub fn failure_level(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else {
        Level::WARN
    }
}

/// Log `error` under `context` and hand back `status` for the response.
pub fn reject(context: &str, status: StatusCode, error: &dyn std::fmt::Display) -> StatusCode {
    let reason = status.canonical_reason().unwrap_or("");
    if failure_level(status) == Level::ERROR {
        tracing::error!(context, status = status.as_u16(), reason, error = %error, "[route] request failed");
    } else {
        tracing::warn!(context, status = status.as_u16(), reason, error = %error, "[route] request rejected");
    }
    status
}

/// Extension trait turning any displayable error into a logged status.
pub trait LogErr<T> {
    /// Server-side failure: logs at error level and answers 500.
    fn log_500(self, context: &str) -> Result<T, StatusCode>;

    /// Answers `status`, logging at the level [`failure_level`] picks for it.
    fn log_status(self, context: &str, status: StatusCode) -> Result<T, StatusCode>;
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn log_500(self, context: &str) -> Result<T, StatusCode> {
        self.log_status(context, StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn log_status(self, context: &str, status: StatusCode) -> Result<T, StatusCode> {
        self.map_err(|e| reject(context, status, &e))
    }
}
