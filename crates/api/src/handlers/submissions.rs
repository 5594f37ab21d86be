//! Handlers for the `/submissions` resource.
//!
//! Every handler resolves the caller, hands it to the engine, and wraps the
//! result in the `{ "data": ... }` envelope. Authorization decisions live in
//! the engine; the role extractors only reject early.

use axum::extract::{Multipart, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pluto_core::assessment::Submission;
use pluto_core::error::CoreError;
use pluto_core::types::DbId;
use pluto_core::workflow::{BatchAssignReport, Listing, SubmissionView};
use serde::Deserialize;

use crate::analysis;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireFacilitator, RequirePsychologist, RequireStudent};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::content_type_of;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /submissions`.
#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub image_ref: String,
}

/// Request body for `POST /submissions/batch-assign`.
#[derive(Debug, Deserialize)]
pub struct BatchAssignRequest {
    pub submission_ids: Vec<DbId>,
    pub psychologist_id: DbId,
}

/// Request body for `POST /submissions/{id}/evaluate`.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub notes: String,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// POST /api/v1/submissions
///
/// Register a drawing that is already in the Blob Store.
pub async fn create(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    Json(input): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Submission>>)> {
    let submission = state
        .engine
        .create_submission(&user.caller(), &input.image_ref)
        .await?;
    let submission = request_analysis(&state, submission).await;
    Ok((StatusCode::CREATED, Json(DataResponse { data: submission })))
}

/// POST /api/v1/submissions/upload
///
/// Multipart upload with a single `file` field. The bytes go to the Blob
/// Store and the resulting reference becomes the submission's `image_ref`.
pub async fn upload(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Submission>>)> {
    let mut file_data: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("drawing").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        file_data = Some((filename, data.to_vec()));
    }

    let (filename, data) =
        file_data.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    let limit = state.config.max_upload_bytes;
    if data.len() > limit {
        return Err(AppError::PayloadTooLarge(format!(
            "Uploaded file is {} bytes; the limit is {limit}",
            data.len()
        )));
    }

    let image_ref = state
        .blobs
        .put(&filename, &data)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let submission = state
        .engine
        .create_submission(&user.caller(), &image_ref)
        .await?;
    let submission = request_analysis(&state, submission).await;
    Ok((StatusCode::CREATED, Json(DataResponse { data: submission })))
}

async fn request_analysis(state: &AppState, submission: Submission) -> Submission {
    match &state.analysis {
        Some(client) => analysis::dispatch(&state.engine, client, submission).await,
        None => submission,
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/submissions/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SubmissionView>>> {
    let view = state.engine.get_submission(&user.caller(), id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/submissions/{id}/image
///
/// The drawing's bytes, for anyone allowed to read the submission itself.
pub async fn image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let view = state.engine.get_submission(&user.caller(), id).await?;
    let bytes = state
        .blobs
        .get(&view.image_ref)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .ok_or(CoreError::NotFound {
            entity: "Drawing",
            id,
        })?;

    Ok(([(CONTENT_TYPE, content_type_of(&view.image_ref))], bytes).into_response())
}

/// GET /api/v1/submissions/mine
pub async fn list_mine(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
) -> AppResult<Json<DataResponse<Listing>>> {
    let listing = state.engine.list_for_student(&user.caller()).await?;
    Ok(Json(DataResponse { data: listing }))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// PUT /api/v1/submissions/{id}/assign/{psychologist_id}
pub async fn assign(
    State(state): State<AppState>,
    RequireFacilitator(user): RequireFacilitator,
    Path((id, psychologist_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Submission>>> {
    let submission = state
        .engine
        .assign(&user.caller(), id, psychologist_id)
        .await?;
    Ok(Json(DataResponse { data: submission }))
}

/// POST /api/v1/submissions/batch-assign
///
/// Always `200` once the call-level checks pass; per-member failures are
/// reported in the body.
pub async fn batch_assign(
    State(state): State<AppState>,
    RequireFacilitator(user): RequireFacilitator,
    Json(input): Json<BatchAssignRequest>,
) -> AppResult<Json<DataResponse<BatchAssignReport>>> {
    let report = state
        .engine
        .batch_assign(&user.caller(), &input.submission_ids, input.psychologist_id)
        .await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/submissions/{id}/evaluate
pub async fn evaluate(
    State(state): State<AppState>,
    RequirePsychologist(user): RequirePsychologist,
    Path(id): Path<DbId>,
    Json(input): Json<EvaluateRequest>,
) -> AppResult<Json<DataResponse<Submission>>> {
    let submission = state
        .engine
        .evaluate(&user.caller(), id, &input.notes)
        .await?;
    Ok(Json(DataResponse { data: submission }))
}
