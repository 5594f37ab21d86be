use axum::routing::get;
use axum::Router;

use crate::handlers::assessments;
use crate::state::AppState;

/// Routes mounted at `/assessments`.
///
/// ```text
/// GET /facilitator   -> facilitator_view
/// GET /psychologist  -> psychologist_view
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/facilitator", get(assessments::facilitator_view))
        .route("/psychologist", get(assessments::psychologist_view))
}
