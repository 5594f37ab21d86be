//! Analysis Service client.
//!
//! [`AnalysisClient`] POSTs `{submission_id, image_ref}` to the configured
//! service and retries failed attempts with a short backoff. The outcome is
//! fed back into the engine by [`dispatch`]:
//!
//! - `200` with `{text, data}` -> `Complete`
//! - `202 Accepted` -> nothing yet; the service answers via the callback route
//! - failure after all retries -> `Failed`

use std::sync::Arc;
use std::time::Duration;

use pluto_core::assessment::{AnalysisOutcome, Submission};
use pluto_core::error::CoreError;
use pluto_core::types::DbId;
use pluto_core::workflow::AssessmentEngine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Backoff between attempts (1 s, 2 s).
const RETRY_DELAYS_SECS: [u64; 2] = [1, 2];

/// HTTP request timeout for a single attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Network, DNS, timeout, or body decoding failure.
    #[error("Analysis request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analysis service returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    submission_id: DbId,
    image_ref: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    text: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// What a single successful exchange produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisReply {
    /// The service answered inline.
    Complete(AnalysisOutcome),
    /// The service accepted the job and will call back.
    Deferred,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AnalysisClient {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

impl AnalysisClient {
    pub fn new(url: impl Into<String>) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry_delays: RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        })
    }

    /// Override the backoff schedule. One extra attempt is made per entry.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Request analysis of one drawing, retrying on failure.
    pub async fn request(
        &self,
        submission_id: DbId,
        image_ref: &str,
    ) -> Result<AnalysisReply, AnalysisError> {
        let payload = AnalysisRequest {
            submission_id,
            image_ref,
        };

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(&payload).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    tracing::warn!(
                        submission_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Analysis request attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(&payload).await
    }

    async fn try_send(&self, payload: &AnalysisRequest<'_>) -> Result<AnalysisReply, AnalysisError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Ok(AnalysisReply::Deferred);
        }
        if !status.is_success() {
            return Err(AnalysisError::HttpStatus(status.as_u16()));
        }
        let body: AnalysisResponse = response.json().await?;
        Ok(AnalysisReply::Complete(AnalysisOutcome::Complete {
            text: body.text,
            data: body.data,
        }))
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Mark `submission` as awaiting analysis, then request it in the background.
///
/// Returns the submission with its `pending` marker so the caller can echo
/// it. The spawned task reports the outcome through the engine. A submission
/// that is already `in_review` is still analysed, without the marker.
pub async fn dispatch(
    engine: &Arc<AssessmentEngine>,
    client: &Arc<AnalysisClient>,
    submission: Submission,
) -> Submission {
    let pending = match engine.mark_analysis_requested(submission.id).await {
        Ok(updated) => updated,
        // Assigned before the marker landed. Reports are still accepted on
        // `in_review`, so the request goes out unmarked.
        Err(CoreError::InvalidTransition {
            status: "in_review",
            ..
        }) => {
            tracing::debug!(
                submission_id = submission.id,
                "Submission already in review; requesting analysis without marker"
            );
            submission
        }
        Err(e) => {
            tracing::error!(
                submission_id = submission.id,
                error = %e,
                "Could not mark analysis pending"
            );
            return submission;
        }
    };

    let engine = Arc::clone(engine);
    let client = Arc::clone(client);
    let submission_id = pending.id;
    let image_ref = pending.image_ref.clone();
    tokio::spawn(async move {
        let outcome = match client.request(submission_id, &image_ref).await {
            Ok(AnalysisReply::Complete(outcome)) => outcome,
            Ok(AnalysisReply::Deferred) => {
                tracing::debug!(submission_id, "Analysis deferred to callback");
                return;
            }
            Err(e) => {
                tracing::error!(submission_id, error = %e, "Analysis failed after all retries");
                AnalysisOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        if let Err(e) = engine.report_analysis(submission_id, outcome).await {
            tracing::warn!(submission_id, error = %e, "Analysis result rejected");
        }
    });

    pending
}
