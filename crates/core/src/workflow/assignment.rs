//! Assignment Coordinator: binds submissions to psychologists.
//!
//! Each assignment runs through [`SubmissionStore::update_exclusive`], so for
//! any one submission at most one `submitted -> in_review` transition can
//! ever succeed. Concurrent attempts serialize on that submission alone; the
//! loser sees `in_review` and fails with `InvalidTransition`.
//!
//! Batch assignment is not atomic: every member is attempted
//! and its outcome reported individually.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;

use crate::assessment::{validate_id, Submission};
use crate::error::CoreError;
use crate::roles::{Caller, Role};
use crate::types::DbId;
use crate::workflow::store::{Identity, IdentityDirectory, SubmissionStore};

/// One member of a batch that could not be assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: DbId,
    /// Machine-readable error code (see [`CoreError::code`]).
    pub reason: &'static str,
    pub message: String,
}

/// Per-member outcome of a batch assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchAssignReport {
    pub success_count: usize,
    pub succeeded: Vec<DbId>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Clone)]
pub struct AssignmentCoordinator {
    store: Arc<dyn SubmissionStore>,
    directory: Arc<dyn IdentityDirectory>,
}

impl AssignmentCoordinator {
    pub fn new(store: Arc<dyn SubmissionStore>, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { store, directory }
    }

    /// Assign one submission. Facilitators only.
    pub async fn assign(
        &self,
        caller: &Caller,
        submission_id: DbId,
        psychologist_id: DbId,
    ) -> Result<Submission, CoreError> {
        caller.require(Role::Facilitator)?;
        validate_id("submission", submission_id)?;
        self.resolve_psychologist(psychologist_id).await?;
        self.transition(caller, submission_id, psychologist_id).await
    }

    /// Assign every id in `submission_ids` to the same psychologist.
    ///
    /// Duplicate ids are collapsed. The caller's role and the target
    /// psychologist are checked once for the whole call; everything else is
    /// a per-member outcome.
    pub async fn batch_assign(
        &self,
        caller: &Caller,
        submission_ids: &[DbId],
        psychologist_id: DbId,
    ) -> Result<BatchAssignReport, CoreError> {
        caller.require(Role::Facilitator)?;

        let mut seen = HashSet::new();
        let ids: Vec<DbId> = submission_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if ids.is_empty() {
            return Err(CoreError::InvalidInput(
                "Batch assignment requires at least one submission id".to_string(),
            ));
        }

        self.resolve_psychologist(psychologist_id).await?;

        let outcomes = join_all(ids.iter().map(|&id| async move {
            let result = match validate_id("submission", id) {
                Ok(()) => self.transition(caller, id, psychologist_id).await,
                Err(e) => Err(e),
            };
            (id, result)
        }))
        .await;

        let mut report = BatchAssignReport::default();
        for (id, result) in outcomes {
            match result {
                Ok(_) => report.succeeded.push(id),
                Err(e) => {
                    tracing::warn!(
                        submission_id = id,
                        psychologist_id,
                        reason = e.code(),
                        error = %e,
                        "Batch member not assigned"
                    );
                    report.failed.push(BatchFailure {
                        id,
                        reason: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        }
        report.success_count = report.succeeded.len();

        tracing::info!(
            caller_id = caller.id,
            psychologist_id,
            requested = ids.len(),
            succeeded = report.success_count,
            failed = report.failed.len(),
            "Batch assignment finished"
        );

        Ok(report)
    }

    /// The target must exist and hold the psychologist role.
    async fn resolve_psychologist(&self, psychologist_id: DbId) -> Result<Identity, CoreError> {
        validate_id("psychologist", psychologist_id)?;
        match self.directory.find(psychologist_id).await? {
            Some(identity) if identity.role == Role::Psychologist => Ok(identity),
            Some(identity) => Err(CoreError::InvalidTarget(format!(
                "User {} is a {}, not a psychologist",
                identity.id, identity.role
            ))),
            None => Err(CoreError::InvalidTarget(format!(
                "No psychologist with id {psychologist_id}"
            ))),
        }
    }

    async fn transition(
        &self,
        caller: &Caller,
        submission_id: DbId,
        psychologist_id: DbId,
    ) -> Result<Submission, CoreError> {
        let at = Utc::now();
        let updated = self
            .store
            .update_exclusive(
                submission_id,
                Box::new(move |current: &Submission| current.assign(psychologist_id, at)),
            )
            .await?;

        tracing::info!(
            submission_id,
            psychologist_id,
            caller_id = caller.id,
            status = %updated.status,
            "Submission assigned"
        );

        Ok(updated)
    }
}
