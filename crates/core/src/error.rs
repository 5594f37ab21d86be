use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid transition: cannot {action} a submission in status '{status}'")]
    InvalidTransition {
        status: &'static str,
        action: &'static str,
    },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code, shared by HTTP responses and batch reports.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CoreError::InvalidTarget(_) => "INVALID_TARGET",
            CoreError::InvalidInput(_) => "INVALID_INPUT",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
