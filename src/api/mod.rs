//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod complaints;
mod documents;
mod system;
mod users;

pub use complaints::*;
pub use documents::*;
pub use system::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
///
/// The payload's fields sit next to `success`, so `T` must serialize as a
/// struct or map, e.g. `{"success": true, "user": {...}}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

/// Payload for responses that only report success.
#[derive(Debug, Serialize)]
pub struct Done {}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(payload: T) -> ApiResult<T> {
    Ok(ApiResponse::new(payload))
}

/// Create a successful API response carrying a human-readable message.
pub fn success_with_message<T: Serialize>(payload: T, message: &str) -> ApiResult<T> {
    Ok(ApiResponse::new(payload).with_message(message))
}

/// Fail with every required field that is absent or blank.
pub(crate) fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<(), AppError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Trimmed value of a field already checked by `require_fields`.
pub(crate) fn field(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Optional query parameter, ignoring blanks.
pub(crate) fn param(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
