//! Request failures and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geotally_core::PortError;
use tracing::error;

#[derive(thiserror::Error, Debug)]
/// Anything that stops a request from producing its payload.
pub enum ApiError {
    /// A query parameter is missing or cannot be parsed.
    #[error("invalid query parameter `{name}`: {reason}")]
    InvalidInput {
        /// Parameter name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// An upstream call failed.
    #[error(transparent)]
    Upstream(#[from] PortError),
}

impl ApiError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            name,
            reason: reason.into(),
        }
    }
}

// Clients only ever see an empty 500; the cause goes to the log.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
