//! Error-to-response mapping

use crate::models::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use campus_provision::ProvisionError;

/// Wrapper turning provisioning errors into structured responses.
/// Known categories map to their HTTP status; everything else is 500.
pub struct ApiError(pub ProvisionError);

impl From<ProvisionError> for ApiError {
    fn from(error: ProvisionError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            ProvisionError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ProvisionError::DomainTaken(_) => (StatusCode::CONFLICT, "domain_taken"),
            ProvisionError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ProvisionError::AttributePollTimeout { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "attribute_poll_timeout")
            }
            ProvisionError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            ProvisionError::Platform(e) if e.is_conflict() => {
                (StatusCode::CONFLICT, "conflict")
            }
            ProvisionError::Platform(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ProvisionError::Platform(_) => (StatusCode::INTERNAL_SERVER_ERROR, "platform_error"),
        };
        let message = match &self.0 {
            // Exhausted polls usually mean platform lag, not a broken
            // request; tell the operator a retry is reasonable.
            ProvisionError::AttributePollTimeout { .. } => format!(
                "{}; the platform may still be catching up, retrying the request is safe",
                self.0
            ),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(ApiResponse::<()>::error(code, &message))).into_response()
    }
}

/// Shorthand for a 400 without going through `ProvisionError`.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(ProvisionError::Validation(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_platform::PlatformError;

    fn status_of(error: ProvisionError) -> StatusCode {
        ApiError(error).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ProvisionError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ProvisionError::DomainTaken("acme.com".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ProvisionError::NotFound("tenant".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ProvisionError::Platform(PlatformError::conflict("dup"))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ProvisionError::Platform(PlatformError::internal("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ProvisionError::AttributePollTimeout {
                collection: "students".into(),
                attribute: "fullName".into(),
                attempts: 7,
                last_error: PlatformError::not_found("no attr"),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
