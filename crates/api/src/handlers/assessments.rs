//! Role dashboards: every submission for facilitators, the assigned queue
//! for psychologists. Both come with derived status counts.

use axum::extract::State;
use axum::Json;
use pluto_core::workflow::Listing;

use crate::error::AppResult;
use crate::middleware::rbac::{RequireFacilitator, RequirePsychologist};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/assessments/facilitator
pub async fn facilitator_view(
    State(state): State<AppState>,
    RequireFacilitator(user): RequireFacilitator,
) -> AppResult<Json<DataResponse<Listing>>> {
    let listing = state.engine.list_for_facilitator(&user.caller()).await?;
    Ok(Json(DataResponse { data: listing }))
}

/// GET /api/v1/assessments/psychologist
pub async fn psychologist_view(
    State(state): State<AppState>,
    RequirePsychologist(user): RequirePsychologist,
) -> AppResult<Json<DataResponse<Listing>>> {
    let listing = state.engine.list_for_psychologist(&user.caller()).await?;
    Ok(Json(DataResponse { data: listing }))
}
