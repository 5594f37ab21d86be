use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pluto_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `pluto_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Missing, malformed, or expired credentials.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request body exceeds a configured size limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    core.code(),
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Unauthorized(msg) => (StatusCode::FORBIDDEN, core.code(), msg.clone()),
                CoreError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, core.code(), core.to_string())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, core.code(), msg.clone()),
                CoreError::InvalidTarget(msg) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, core.code(), msg.clone())
                }
                CoreError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, core.code(), msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        core.code(),
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_core_errors_map_to_expected_statuses() {
        let cases = [
            (
                CoreError::NotFound {
                    entity: "Submission",
                    id: 1,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::Unauthorized("no".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                CoreError::InvalidTransition {
                    status: "in_review",
                    action: "assign",
                },
                StatusCode::CONFLICT,
            ),
            (CoreError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                CoreError::InvalidTarget("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CoreError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                CoreError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (core, expected) in cases {
            assert_eq!(status_of(AppError::Core(core)), expected);
        }
    }

    #[test]
    fn test_unauthenticated_is_401() {
        assert_eq!(
            status_of(AppError::Unauthenticated("missing token".into())),
            StatusCode::UNAUTHORIZED
        );
    }
}
