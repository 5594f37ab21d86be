//! Submission entity model and DTOs.
//!
//! The row flattens the domain's `analysis` and `evaluation` into nullable
//! columns; [`SubmissionRow::into_domain`] and [`SubmissionState::from_domain`]
//! translate between the two shapes.

use pluto_core::assessment::{Analysis, Evaluation, Submission};
use pluto_core::error::CoreError;
use pluto_core::types::{DbId, Timestamp};
use sqlx::FromRow;

pub const ANALYSIS_PENDING: &str = "pending";
pub const ANALYSIS_COMPLETE: &str = "complete";
pub const ANALYSIS_FAILED: &str = "failed";

/// A row from the `submissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRow {
    pub id: DbId,
    pub student_id: DbId,
    pub image_ref: String,
    pub status: String,
    pub submitted_at: Timestamp,
    pub psychologist_id: Option<DbId>,
    pub assigned_at: Option<Timestamp>,
    pub analysis_state: Option<String>,
    pub analysis_text: Option<String>,
    pub analysis_data: Option<serde_json::Value>,
    pub analysis_error: Option<String>,
    pub analysis_requested_at: Option<Timestamp>,
    pub analysis_reported_at: Option<Timestamp>,
    pub evaluation_notes: Option<String>,
    pub evaluated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a new submission.
#[derive(Debug, Clone)]
pub struct CreateSubmission {
    pub student_id: DbId,
    pub image_ref: String,
    pub submitted_at: Timestamp,
}

/// Every mutable column of a submission, written back after a transition.
#[derive(Debug, Clone)]
pub struct SubmissionState {
    pub id: DbId,
    pub status: String,
    pub psychologist_id: Option<DbId>,
    pub assigned_at: Option<Timestamp>,
    pub analysis_state: Option<String>,
    pub analysis_text: Option<String>,
    pub analysis_data: Option<serde_json::Value>,
    pub analysis_error: Option<String>,
    pub analysis_requested_at: Option<Timestamp>,
    pub analysis_reported_at: Option<Timestamp>,
    pub evaluation_notes: Option<String>,
    pub evaluated_at: Option<Timestamp>,
}

impl SubmissionRow {
    pub fn into_domain(self) -> Result<Submission, CoreError> {
        let status = self.status.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Submission {} has unknown status '{}'",
                self.id, self.status
            ))
        })?;

        let analysis = match self.analysis_state.as_deref() {
            None => None,
            Some(ANALYSIS_PENDING) => Some(Analysis::Pending {
                requested_at: self.analysis_requested_at.unwrap_or(self.submitted_at),
            }),
            Some(ANALYSIS_COMPLETE) => Some(Analysis::Complete {
                text: self.analysis_text.unwrap_or_default(),
                data: self.analysis_data,
                reported_at: self.analysis_reported_at.unwrap_or(self.updated_at),
            }),
            Some(ANALYSIS_FAILED) => Some(Analysis::Failed {
                reason: self.analysis_error.unwrap_or_default(),
                reported_at: self.analysis_reported_at.unwrap_or(self.updated_at),
            }),
            Some(other) => {
                return Err(CoreError::Internal(format!(
                    "Submission {} has unknown analysis state '{other}'",
                    self.id
                )))
            }
        };

        let evaluation = match (self.evaluation_notes, self.evaluated_at) {
            (Some(notes), Some(recorded_at)) => Some(Evaluation { notes, recorded_at }),
            _ => None,
        };

        Ok(Submission {
            id: self.id,
            student_id: self.student_id,
            image_ref: self.image_ref,
            status,
            submitted_at: self.submitted_at,
            assigned_psychologist_id: self.psychologist_id,
            assigned_at: self.assigned_at,
            analysis,
            evaluation,
        })
    }
}

impl SubmissionState {
    pub fn from_domain(submission: &Submission) -> Self {
        let mut state = SubmissionState {
            id: submission.id,
            status: submission.status.as_str().to_string(),
            psychologist_id: submission.assigned_psychologist_id,
            assigned_at: submission.assigned_at,
            analysis_state: None,
            analysis_text: None,
            analysis_data: None,
            analysis_error: None,
            analysis_requested_at: None,
            analysis_reported_at: None,
            evaluation_notes: submission.evaluation.as_ref().map(|e| e.notes.clone()),
            evaluated_at: submission.evaluation.as_ref().map(|e| e.recorded_at),
        };

        match &submission.analysis {
            None => {}
            Some(Analysis::Pending { requested_at }) => {
                state.analysis_state = Some(ANALYSIS_PENDING.to_string());
                state.analysis_requested_at = Some(*requested_at);
            }
            Some(Analysis::Complete {
                text,
                data,
                reported_at,
            }) => {
                state.analysis_state = Some(ANALYSIS_COMPLETE.to_string());
                state.analysis_text = Some(text.clone());
                state.analysis_data = data.clone();
                state.analysis_reported_at = Some(*reported_at);
            }
            Some(Analysis::Failed {
                reason,
                reported_at,
            }) => {
                state.analysis_state = Some(ANALYSIS_FAILED.to_string());
                state.analysis_error = Some(reason.clone());
                state.analysis_reported_at = Some(*reported_at);
            }
        }

        state
    }
}
