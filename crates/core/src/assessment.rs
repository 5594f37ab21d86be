//! The `Submission` aggregate and its assessment state machine.
//!
//! Every transition is a pure function from the current submission to the
//! next one. Callers are responsible for running them inside the
//! submission's exclusive section (see [`crate::workflow::store`]).
//!
//! ```text
//! submitted --analysis ok------> submitted (analysis attached)
//! submitted --analysis error---> failed
//! submitted --assign-----------> in_review
//! in_review --evaluate---------> reviewed
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::{Caller, Role};
use crate::types::{DbId, Timestamp};

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

pub const STATUS_SUBMITTED: &str = "submitted";
pub const STATUS_IN_REVIEW: &str = "in_review";
pub const STATUS_REVIEWED: &str = "reviewed";
pub const STATUS_FAILED: &str = "failed";

/// All valid status values, in lifecycle order.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_SUBMITTED,
    STATUS_IN_REVIEW,
    STATUS_REVIEWED,
    STATUS_FAILED,
];

/// Maximum length for evaluation notes.
pub const MAX_NOTES_LENGTH: usize = 20_000;

/// Maximum length for a blob store reference.
pub const MAX_IMAGE_REF_LENGTH: usize = 1_024;

/* --------------------------------------------------------------------------
Status
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    InReview,
    Reviewed,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => STATUS_SUBMITTED,
            SubmissionStatus::InReview => STATUS_IN_REVIEW,
            SubmissionStatus::Reviewed => STATUS_REVIEWED,
            SubmissionStatus::Failed => STATUS_FAILED,
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionStatus::Reviewed | SubmissionStatus::Failed)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            STATUS_SUBMITTED => Ok(SubmissionStatus::Submitted),
            STATUS_IN_REVIEW => Ok(SubmissionStatus::InReview),
            STATUS_REVIEWED => Ok(SubmissionStatus::Reviewed),
            STATUS_FAILED => Ok(SubmissionStatus::Failed),
            other => Err(CoreError::InvalidInput(format!(
                "Invalid status '{other}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }
}

/* --------------------------------------------------------------------------
Analysis and evaluation
-------------------------------------------------------------------------- */

/// Automated, non-authoritative observations attached before human review.
///
/// An absent analysis (`None` on the submission) means no analysis was ever
/// requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Analysis {
    Pending {
        requested_at: Timestamp,
    },
    Complete {
        text: String,
        data: Option<serde_json::Value>,
        reported_at: Timestamp,
    },
    Failed {
        reason: String,
        reported_at: Timestamp,
    },
}

impl Analysis {
    pub fn is_final(&self) -> bool {
        !matches!(self, Analysis::Pending { .. })
    }
}

/// What the Analysis Service reports back for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Complete {
        text: String,
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    Failed {
        reason: String,
    },
}

/// The assigned psychologist's professional notes. Written exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub notes: String,
    pub recorded_at: Timestamp,
}

/* --------------------------------------------------------------------------
Submission
-------------------------------------------------------------------------- */

/// One drawing plus its assessment lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: DbId,
    pub student_id: DbId,
    pub image_ref: String,
    pub status: SubmissionStatus,
    pub submitted_at: Timestamp,
    pub assigned_psychologist_id: Option<DbId>,
    pub assigned_at: Option<Timestamp>,
    pub analysis: Option<Analysis>,
    pub evaluation: Option<Evaluation>,
}

/// Input for creating a submission. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub student_id: DbId,
    pub image_ref: String,
    pub submitted_at: Timestamp,
}

impl Submission {
    /// Mark an analysis as requested. Only valid before any analysis exists.
    pub fn request_analysis(&self, at: Timestamp) -> Result<Submission, CoreError> {
        if self.status != SubmissionStatus::Submitted || self.analysis.is_some() {
            return Err(self.invalid("request analysis for"));
        }
        Ok(Submission {
            analysis: Some(Analysis::Pending { requested_at: at }),
            ..self.clone()
        })
    }

    /// Attach the Analysis Service's final report.
    ///
    /// On `submitted` a failure moves the submission to `failed`. On
    /// `in_review` the result is attached without a status change.
    pub fn apply_analysis(
        &self,
        outcome: AnalysisOutcome,
        at: Timestamp,
    ) -> Result<Submission, CoreError> {
        if self.status.is_terminal() {
            return Err(self.invalid("report analysis for"));
        }
        if self.analysis.as_ref().is_some_and(Analysis::is_final) {
            return Err(self.invalid("re-report analysis for"));
        }

        let mut next = self.clone();
        match outcome {
            AnalysisOutcome::Complete { text, data } => {
                next.analysis = Some(Analysis::Complete {
                    text,
                    data,
                    reported_at: at,
                });
            }
            AnalysisOutcome::Failed { reason } => {
                next.analysis = Some(Analysis::Failed {
                    reason,
                    reported_at: at,
                });
                if self.status == SubmissionStatus::Submitted {
                    next.status = SubmissionStatus::Failed;
                }
            }
        }
        Ok(next)
    }

    /// Bind the submission to a psychologist. Re-assignment is never allowed.
    pub fn assign(&self, psychologist_id: DbId, at: Timestamp) -> Result<Submission, CoreError> {
        if self.status != SubmissionStatus::Submitted {
            return Err(self.invalid("assign"));
        }
        Ok(Submission {
            status: SubmissionStatus::InReview,
            assigned_psychologist_id: Some(psychologist_id),
            assigned_at: Some(at),
            ..self.clone()
        })
    }

    /// Record the assigned psychologist's evaluation, finalizing the submission.
    pub fn evaluate(
        &self,
        caller_id: DbId,
        notes: &str,
        at: Timestamp,
    ) -> Result<Submission, CoreError> {
        if self.status != SubmissionStatus::InReview {
            return Err(self.invalid("evaluate"));
        }
        if self.assigned_psychologist_id != Some(caller_id) {
            return Err(CoreError::Unauthorized(format!(
                "Submission {} is not assigned to psychologist {caller_id}",
                self.id
            )));
        }
        validate_notes(notes)?;
        Ok(Submission {
            status: SubmissionStatus::Reviewed,
            evaluation: Some(Evaluation {
                notes: notes.to_string(),
                recorded_at: at,
            }),
            ..self.clone()
        })
    }

    /// Students see their own, facilitators see all, psychologists see
    /// only what is assigned to them.
    pub fn is_visible_to(&self, caller: &Caller) -> bool {
        match caller.role {
            Role::Student => self.student_id == caller.id,
            Role::Facilitator => true,
            Role::Psychologist => self.assigned_psychologist_id == Some(caller.id),
        }
    }

    /// Check the cross-field invariants of the aggregate.
    pub fn check_invariants(&self) -> Result<(), String> {
        let assigned_status = matches!(
            self.status,
            SubmissionStatus::InReview | SubmissionStatus::Reviewed
        );
        if self.assigned_psychologist_id.is_some() != assigned_status {
            return Err(format!(
                "assignee presence does not match status '{}'",
                self.status
            ));
        }
        if self.assigned_at.is_some() != self.assigned_psychologist_id.is_some() {
            return Err("assigned_at must be set together with the assignee".to_string());
        }
        if self.evaluation.is_some() != (self.status == SubmissionStatus::Reviewed) {
            return Err(format!(
                "evaluation presence does not match status '{}'",
                self.status
            ));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            status: self.status.as_str(),
            action,
        }
    }
}

/* --------------------------------------------------------------------------
Validation functions
-------------------------------------------------------------------------- */

/// Evaluation notes must contain something other than whitespace.
pub fn validate_notes(notes: &str) -> Result<(), CoreError> {
    if notes.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "Evaluation notes must not be empty".to_string(),
        ));
    }
    if notes.len() > MAX_NOTES_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Evaluation notes exceed maximum length of {MAX_NOTES_LENGTH} characters"
        )));
    }
    Ok(())
}

/// A blob store reference must be non-empty and reasonably short.
pub fn validate_image_ref(image_ref: &str) -> Result<(), CoreError> {
    if image_ref.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "Image reference must not be empty".to_string(),
        ));
    }
    if image_ref.len() > MAX_IMAGE_REF_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Image reference exceeds maximum length of {MAX_IMAGE_REF_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Ids are positive BIGSERIAL values; anything else is malformed.
pub fn validate_id(entity: &'static str, id: DbId) -> Result<(), CoreError> {
    if id <= 0 {
        return Err(CoreError::InvalidInput(format!(
            "Malformed {entity} id {id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn fresh() -> Submission {
        Submission {
            id: 1,
            student_id: 10,
            image_ref: "uploads/a.png".to_string(),
            status: SubmissionStatus::Submitted,
            submitted_at: Utc::now(),
            assigned_psychologist_id: None,
            assigned_at: None,
            analysis: None,
            evaluation: None,
        }
    }

    fn complete(text: &str) -> AnalysisOutcome {
        AnalysisOutcome::Complete {
            text: text.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for name in VALID_STATUSES {
            let status: SubmissionStatus = name.parse().unwrap();
            assert_eq!(status.as_str(), *name);
        }
        assert!("processing".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SubmissionStatus::Reviewed.is_terminal());
        assert!(SubmissionStatus::Failed.is_terminal());
        assert!(!SubmissionStatus::Submitted.is_terminal());
        assert!(!SubmissionStatus::InReview.is_terminal());
    }

    #[test]
    fn test_analysis_success_keeps_submitted() {
        let next = fresh().apply_analysis(complete("tree is large"), Utc::now()).unwrap();
        assert_eq!(next.status, SubmissionStatus::Submitted);
        assert_matches!(next.analysis, Some(Analysis::Complete { ref text, .. }) if text == "tree is large");
        next.check_invariants().unwrap();
    }

    #[test]
    fn test_analysis_failure_fails_submission() {
        let outcome = AnalysisOutcome::Failed {
            reason: "model timeout".to_string(),
        };
        let next = fresh().apply_analysis(outcome, Utc::now()).unwrap();
        assert_eq!(next.status, SubmissionStatus::Failed);
        next.check_invariants().unwrap();
    }

    #[test]
    fn test_failed_submission_cannot_be_assigned() {
        let failed = fresh()
            .apply_analysis(
                AnalysisOutcome::Failed {
                    reason: "x".to_string(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_matches!(
            failed.assign(7, Utc::now()),
            Err(CoreError::InvalidTransition { status: STATUS_FAILED, .. })
        );
    }

    #[test]
    fn test_second_final_analysis_rejected() {
        let analysed = fresh().apply_analysis(complete("a"), Utc::now()).unwrap();
        assert_matches!(
            analysed.apply_analysis(complete("b"), Utc::now()),
            Err(CoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn test_pending_analysis_accepts_final_report() {
        let pending = fresh().request_analysis(Utc::now()).unwrap();
        assert_matches!(pending.analysis, Some(Analysis::Pending { .. }));
        assert_matches!(pending.request_analysis(Utc::now()), Err(CoreError::InvalidTransition { .. }));

        let done = pending.apply_analysis(complete("ok"), Utc::now()).unwrap();
        assert!(done.analysis.unwrap().is_final());
    }

    #[test]
    fn test_analysis_on_in_review_attaches_without_status_change() {
        let assigned = fresh().assign(7, Utc::now()).unwrap();
        let failed_report = assigned
            .apply_analysis(
                AnalysisOutcome::Failed {
                    reason: "x".to_string(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(failed_report.status, SubmissionStatus::InReview);
        assert_matches!(failed_report.analysis, Some(Analysis::Failed { .. }));
    }

    #[test]
    fn test_assign_moves_to_in_review() {
        let next = fresh().assign(7, Utc::now()).unwrap();
        assert_eq!(next.status, SubmissionStatus::InReview);
        assert_eq!(next.assigned_psychologist_id, Some(7));
        assert!(next.assigned_at.is_some());
        next.check_invariants().unwrap();
    }

    #[test]
    fn test_reassignment_rejected() {
        let assigned = fresh().assign(7, Utc::now()).unwrap();
        assert_matches!(
            assigned.assign(8, Utc::now()),
            Err(CoreError::InvalidTransition { status: STATUS_IN_REVIEW, action: "assign" })
        );
    }

    #[test]
    fn test_evaluate_by_assignee_reviews() {
        let assigned = fresh().assign(7, Utc::now()).unwrap();
        let reviewed = assigned.evaluate(7, "Stable presentation.", Utc::now()).unwrap();
        assert_eq!(reviewed.status, SubmissionStatus::Reviewed);
        assert_eq!(reviewed.evaluation.as_ref().unwrap().notes, "Stable presentation.");
        reviewed.check_invariants().unwrap();
    }

    #[test]
    fn test_evaluate_by_other_psychologist_unauthorized() {
        let assigned = fresh().assign(7, Utc::now()).unwrap();
        assert_matches!(
            assigned.evaluate(8, "notes", Utc::now()),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn test_evaluate_outside_in_review_invalid() {
        assert_matches!(
            fresh().evaluate(7, "notes", Utc::now()),
            Err(CoreError::InvalidTransition { status: STATUS_SUBMITTED, .. })
        );
        let reviewed = fresh()
            .assign(7, Utc::now())
            .unwrap()
            .evaluate(7, "first", Utc::now())
            .unwrap();
        assert_matches!(
            reviewed.evaluate(7, "second", Utc::now()),
            Err(CoreError::InvalidTransition { status: STATUS_REVIEWED, .. })
        );
    }

    #[test]
    fn test_empty_notes_rejected() {
        assert_matches!(validate_notes(""), Err(CoreError::InvalidInput(_)));
        assert_matches!(validate_notes("   \n"), Err(CoreError::InvalidInput(_)));
        assert!(validate_notes("ok").is_ok());
    }

    #[test]
    fn test_overlong_notes_rejected() {
        let notes = "a".repeat(MAX_NOTES_LENGTH + 1);
        assert_matches!(validate_notes(&notes), Err(CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_id_and_image_ref() {
        assert!(validate_id("submission", 1).is_ok());
        assert_matches!(validate_id("submission", 0), Err(CoreError::InvalidInput(_)));
        assert_matches!(validate_id("submission", -4), Err(CoreError::InvalidInput(_)));
        assert_matches!(validate_image_ref(" "), Err(CoreError::InvalidInput(_)));
        assert!(validate_image_ref("uploads/x.png").is_ok());
    }

    #[test]
    fn test_visibility_rules() {
        let assigned = fresh().assign(7, Utc::now()).unwrap();
        let owner = Caller::new(10, Role::Student);
        let other_student = Caller::new(11, Role::Student);
        let facilitator = Caller::new(3, Role::Facilitator);
        let assignee = Caller::new(7, Role::Psychologist);
        let other_psych = Caller::new(8, Role::Psychologist);

        assert!(assigned.is_visible_to(&owner));
        assert!(!assigned.is_visible_to(&other_student));
        assert!(assigned.is_visible_to(&facilitator));
        assert!(assigned.is_visible_to(&assignee));
        assert!(!assigned.is_visible_to(&other_psych));
        assert!(!fresh().is_visible_to(&assignee));
    }

    #[test]
    fn test_invariant_check_catches_inconsistency() {
        let mut broken = fresh();
        broken.assigned_psychologist_id = Some(7);
        assert!(broken.check_invariants().is_err());
    }
}
