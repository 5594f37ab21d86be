use axum::extract::State;
use axum::Json;
use pluto_core::workflow::Identity;

use crate::error::AppResult;
use crate::middleware::rbac::RequireFacilitator;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/psychologists
///
/// Assignment targets, ordered by email.
pub async fn list(
    State(state): State<AppState>,
    RequireFacilitator(user): RequireFacilitator,
) -> AppResult<Json<DataResponse<Vec<Identity>>>> {
    let psychologists = state.engine.list_psychologists(&user.caller()).await?;
    Ok(Json(DataResponse {
        data: psychologists,
    }))
}
