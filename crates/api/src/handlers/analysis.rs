//! Analysis Service callback.
//!
//! The service is not a platform user; it authenticates with a shared
//! secret in the `X-Analysis-Token` header instead of a JWT.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hmac::{Hmac, Mac};
use pluto_core::assessment::AnalysisOutcome;
use pluto_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const ANALYSIS_TOKEN_HEADER: &str = "x-analysis-token";

type HmacSha256 = Hmac<sha2::Sha256>;

/// Compare the presented token with the configured one in constant time.
///
/// Both sides are MACed under the configured token, so the comparison runs
/// over fixed-length digests regardless of what the caller sent.
fn token_matches(presented: &str, expected: &str) -> bool {
    let mac_of = |input: &str| {
        HmacSha256::new_from_slice(expected.as_bytes()).map(|mut mac| {
            mac.update(input.as_bytes());
            mac
        })
    };
    match (mac_of(expected), mac_of(presented)) {
        (Ok(expected_mac), Ok(presented_mac)) => presented_mac
            .verify_slice(&expected_mac.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

/// POST /api/v1/submissions/{id}/analysis
///
/// Body: `{"status":"complete","text":..,"data":..}` or
/// `{"status":"failed","reason":..}`. Reports for unknown submissions are
/// acknowledged and dropped.
pub async fn report(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
    Json(outcome): Json<AnalysisOutcome>,
) -> AppResult<StatusCode> {
    let expected = state
        .config
        .analysis_callback_token
        .as_deref()
        .ok_or_else(|| AppError::Unauthenticated("Analysis callbacks are not enabled".into()))?;

    let presented = headers
        .get(ANALYSIS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Missing X-Analysis-Token header".into()))?;

    if !token_matches(presented, expected) {
        return Err(AppError::Unauthenticated("Invalid analysis token".into()));
    }

    state.engine.report_analysis(id, outcome).await?;
    Ok(StatusCode::NO_CONTENT)
}
