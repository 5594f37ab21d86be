//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests from any other
//! role with 403. The engine repeats the role check, so these only move the
//! rejection ahead of body parsing.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pluto_core::roles::Role;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: Role,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    user.caller().require(role)?;
    Ok(user)
}

/// Requires the `student` role.
///
/// ```ignore
/// async fn upload(RequireStudent(user): RequireStudent) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireStudent(pub AuthUser);

impl FromRequestParts<AppState> for RequireStudent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Student).await.map(RequireStudent)
    }
}

/// Requires the `facilitator` role.
pub struct RequireFacilitator(pub AuthUser);

impl FromRequestParts<AppState> for RequireFacilitator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Facilitator)
            .await
            .map(RequireFacilitator)
    }
}

/// Requires the `psychologist` role.
pub struct RequirePsychologist(pub AuthUser);

impl FromRequestParts<AppState> for RequirePsychologist {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Psychologist)
            .await
            .map(RequirePsychologist)
    }
}
