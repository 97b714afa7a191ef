use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Internal,
        }
    }
}

/// Error body returned by the backend. `detail` is the usual single message;
/// field validation failures arrive as a map of field name to messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Error)]
#[error("{message} (status {status})")]
pub struct ApiException {
    pub code: ErrorCode,
    pub message: String,
    pub status: u16,
    pub errors: Option<HashMap<String, Vec<String>>>,
}

impl ApiException {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            message: message.into(),
            status,
            errors: None,
        }
    }

    /// Builds the exception from a failed response, preferring the backend's
    /// `detail` over the generic status text.
    pub fn from_body(status: u16, fallback: impl Into<String>, body: ErrorBody) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            message: body.detail.unwrap_or_else(|| fallback.into()),
            status,
            errors: body.errors,
        }
    }
}
