//! Platform error model

use thiserror::Error;

/// Error returned by the remote platform management API.
///
/// The numeric code mirrors the platform's status codes and is
/// load-bearing: `409` marks an already-exists conflict (treated as an
/// idempotent skip by provisioning) and `404` marks not-found (treated
/// as retryable while polling for attribute availability).
#[derive(Debug, Clone, Error)]
#[error("{error_type} ({code}): {message}")]
pub struct PlatformError {
    /// Numeric status code from the platform.
    pub code: u16,
    /// Machine-readable error type.
    pub error_type: String,
    /// Human-readable message.
    pub message: String,
}

impl PlatformError {
    /// Build an error from raw platform fields.
    pub fn new(code: u16, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// 409: the resource already exists.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, "resource_already_exists", message)
    }

    /// 404: the resource does not exist (or is not yet visible).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "resource_not_found", message)
    }

    /// 400: the request was malformed.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(400, "invalid_request", message)
    }

    /// 500: opaque server-side failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "internal_error", message)
    }

    /// Whether this is an already-exists conflict.
    pub fn is_conflict(&self) -> bool {
        self.code == 409
    }

    /// Whether this is a not-found response.
    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }
}

/// Result type for platform calls.
pub type PlatformResult<T> = Result<T, PlatformError>;
