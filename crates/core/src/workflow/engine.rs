//! The Assessment Workflow Engine.
//!
//! Owns the `Submission` lifecycle: creation, analysis reporting,
//! assignment (delegated to [`AssignmentCoordinator`]), evaluation, and the
//! role-scoped queries. Stateless per call beyond the submission store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::assessment::{
    validate_id, validate_image_ref, validate_notes, AnalysisOutcome, NewSubmission, Submission,
};
use crate::error::CoreError;
use crate::roles::{Caller, Role};
use crate::types::DbId;
use crate::workflow::assignment::{AssignmentCoordinator, BatchAssignReport};
use crate::workflow::store::{Identity, IdentityDirectory, SubmissionFilter, SubmissionStore};
use crate::workflow::views::{self, Listing, SubmissionView, ViewScope};

#[derive(Clone)]
pub struct AssessmentEngine {
    store: Arc<dyn SubmissionStore>,
    directory: Arc<dyn IdentityDirectory>,
    coordinator: AssignmentCoordinator,
}

impl AssessmentEngine {
    pub fn new(store: Arc<dyn SubmissionStore>, directory: Arc<dyn IdentityDirectory>) -> Self {
        let coordinator = AssignmentCoordinator::new(Arc::clone(&store), Arc::clone(&directory));
        Self {
            store,
            directory,
            coordinator,
        }
    }

    pub fn directory(&self) -> &Arc<dyn IdentityDirectory> {
        &self.directory
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Create a submission in status `submitted`. Students only.
    pub async fn create_submission(
        &self,
        caller: &Caller,
        image_ref: &str,
    ) -> Result<Submission, CoreError> {
        caller.require(Role::Student)?;
        validate_image_ref(image_ref)?;

        let submission = self
            .store
            .insert(NewSubmission {
                student_id: caller.id,
                image_ref: image_ref.to_string(),
                submitted_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            submission_id = submission.id,
            student_id = caller.id,
            "Submission created"
        );
        Ok(submission)
    }

    /// Record that an analysis has been requested from the Analysis Service.
    pub async fn mark_analysis_requested(&self, submission_id: DbId) -> Result<Submission, CoreError> {
        validate_id("submission", submission_id)?;
        let at = Utc::now();
        self.store
            .update_exclusive(
                submission_id,
                Box::new(move |current: &Submission| current.request_analysis(at)),
            )
            .await
    }

    /// Feed the Analysis Service's result into the state machine.
    ///
    /// A report for a submission that no longer exists is logged and
    /// dropped; there is nobody to report the failure to.
    pub async fn report_analysis(
        &self,
        submission_id: DbId,
        outcome: AnalysisOutcome,
    ) -> Result<(), CoreError> {
        validate_id("submission", submission_id)?;
        let at = Utc::now();
        let succeeded = matches!(outcome, AnalysisOutcome::Complete { .. });

        let result = self
            .store
            .update_exclusive(
                submission_id,
                Box::new(move |current: &Submission| current.apply_analysis(outcome, at)),
            )
            .await;

        match result {
            Ok(updated) => {
                tracing::info!(
                    submission_id,
                    succeeded,
                    status = %updated.status,
                    "Analysis reported"
                );
                Ok(())
            }
            Err(CoreError::NotFound { .. }) => {
                tracing::warn!(submission_id, "Dropping analysis report for unknown submission");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn assign(
        &self,
        caller: &Caller,
        submission_id: DbId,
        psychologist_id: DbId,
    ) -> Result<Submission, CoreError> {
        self.coordinator
            .assign(caller, submission_id, psychologist_id)
            .await
    }

    pub async fn batch_assign(
        &self,
        caller: &Caller,
        submission_ids: &[DbId],
        psychologist_id: DbId,
    ) -> Result<BatchAssignReport, CoreError> {
        self.coordinator
            .batch_assign(caller, submission_ids, psychologist_id)
            .await
    }

    /// Record the assigned psychologist's evaluation.
    ///
    /// Role and notes are checked up front; status and assignee are checked
    /// inside the submission's exclusive section.
    pub async fn evaluate(
        &self,
        caller: &Caller,
        submission_id: DbId,
        notes: &str,
    ) -> Result<Submission, CoreError> {
        caller.require(Role::Psychologist)?;
        validate_id("submission", submission_id)?;
        validate_notes(notes)?;

        let at = Utc::now();
        let caller_id = caller.id;
        let notes = notes.to_string();
        let updated = self
            .store
            .update_exclusive(
                submission_id,
                Box::new(move |current: &Submission| current.evaluate(caller_id, &notes, at)),
            )
            .await?;

        tracing::info!(
            submission_id,
            psychologist_id = caller_id,
            status = %updated.status,
            "Evaluation recorded"
        );
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Fetch one submission as seen by `caller`.
    pub async fn get_submission(
        &self,
        caller: &Caller,
        submission_id: DbId,
    ) -> Result<SubmissionView, CoreError> {
        validate_id("submission", submission_id)?;
        let submission = self
            .store
            .get(submission_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Submission",
                id: submission_id,
            })?;

        if !submission.is_visible_to(caller) {
            return Err(CoreError::Unauthorized(format!(
                "Submission {submission_id} is not visible to this caller"
            )));
        }

        let identities = self.identities_for(std::slice::from_ref(&submission)).await?;
        Ok(views::project_one(submission, &identities, scope_for(caller.role)))
    }

    /// Every submission, joined with student and psychologist identities.
    pub async fn list_for_facilitator(&self, caller: &Caller) -> Result<Listing, CoreError> {
        caller.require(Role::Facilitator)?;
        self.listing(SubmissionFilter::All, ViewScope::Facilitator).await
    }

    /// Submissions assigned to the calling psychologist.
    pub async fn list_for_psychologist(&self, caller: &Caller) -> Result<Listing, CoreError> {
        caller.require(Role::Psychologist)?;
        self.listing(SubmissionFilter::Psychologist(caller.id), ViewScope::Psychologist)
            .await
    }

    /// Submissions owned by the calling student.
    pub async fn list_for_student(&self, caller: &Caller) -> Result<Listing, CoreError> {
        caller.require(Role::Student)?;
        self.listing(SubmissionFilter::Student(caller.id), ViewScope::Student)
            .await
    }

    /// Possible assignment targets. Facilitators only.
    pub async fn list_psychologists(&self, caller: &Caller) -> Result<Vec<Identity>, CoreError> {
        caller.require(Role::Facilitator)?;
        self.directory.list_by_role(Role::Psychologist).await
    }

    async fn listing(
        &self,
        filter: SubmissionFilter,
        scope: ViewScope,
    ) -> Result<Listing, CoreError> {
        let submissions = self.store.list(filter).await?;
        let identities = self.identities_for(&submissions).await?;
        Ok(views::project(submissions, &identities, scope))
    }

    async fn identities_for(
        &self,
        submissions: &[Submission],
    ) -> Result<HashMap<DbId, Identity>, CoreError> {
        let ids = views::referenced_identities(submissions);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let found = self.directory.find_many(&ids).await?;
        Ok(found.into_iter().map(|i| (i.id, i)).collect())
    }
}

fn scope_for(role: Role) -> ViewScope {
    match role {
        Role::Facilitator => ViewScope::Facilitator,
        Role::Psychologist => ViewScope::Psychologist,
        Role::Student => ViewScope::Student,
    }
}
