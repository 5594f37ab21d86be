use axum::routing::get;
use axum::Router;

use crate::handlers::psychologists;
use crate::state::AppState;

/// Routes mounted at `/psychologists`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(psychologists::list))
}
