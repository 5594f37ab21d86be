//! Route definitions for the `/submissions` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{analysis, submissions};
use crate::state::AppState;

/// Routes mounted at `/submissions`.
///
/// ```text
/// POST /                                -> create
/// POST /upload                          -> upload
/// GET  /mine                            -> list_mine
/// POST /batch-assign                    -> batch_assign
/// GET  /{id}                            -> get_by_id
/// GET  /{id}/image                      -> image
/// PUT  /{id}/assign/{psychologist_id}   -> assign
/// POST /{id}/evaluate                   -> evaluate
/// POST /{id}/analysis                   -> analysis::report
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submissions::create))
        .route("/upload", post(submissions::upload))
        .route("/mine", get(submissions::list_mine))
        .route("/batch-assign", post(submissions::batch_assign))
        .route("/{id}", get(submissions::get_by_id))
        .route("/{id}/image", get(submissions::image))
        .route("/{id}/assign/{psychologist_id}", put(submissions::assign))
        .route("/{id}/evaluate", post(submissions::evaluate))
        .route("/{id}/analysis", post(analysis::report))
}
