pub mod assessments;
pub mod auth;
pub mod health;
pub mod psychologists;
pub mod submissions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                               register (public)
/// /auth/login                                  login (public)
/// /auth/me                                     current identity
///
/// /submissions                                 create (student)
/// /submissions/upload                          multipart upload (student)
/// /submissions/mine                            student view
/// /submissions/batch-assign                    batch assign (facilitator)
/// /submissions/{id}                            get (visibility-checked)
/// /submissions/{id}/image                      drawing bytes (visibility-checked)
/// /submissions/{id}/assign/{psychologist_id}   assign (facilitator, PUT)
/// /submissions/{id}/evaluate                   evaluate (psychologist)
/// /submissions/{id}/analysis                   analysis callback (shared token)
///
/// /assessments/facilitator                     facilitator view
/// /assessments/psychologist                    psychologist view
///
/// /psychologists                               assignment targets (facilitator)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/submissions", submissions::router())
        .nest("/assessments", assessments::router())
        .nest("/psychologists", psychologists::router())
}
