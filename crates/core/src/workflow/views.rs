//! Role-scoped read projections over the Submission set.
//!
//! Projections hold no state of their own. Ordering is `submitted_at`
//! descending with `id` descending as the tie-breaker, so repeated listings
//! of the same data always come back in the same order.

use std::collections::HashMap;

use serde::Serialize;

use crate::assessment::{Analysis, Evaluation, Submission, SubmissionStatus};
use crate::types::{DbId, Timestamp};
use crate::workflow::store::Identity;

/// Which role a projection is built for. Controls which details are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    Facilitator,
    Psychologist,
    Student,
}

impl ViewScope {
    /// Psychologists and the owning student see analysis text and notes.
    fn includes_details(self) -> bool {
        matches!(self, ViewScope::Psychologist | ViewScope::Student)
    }
}

/// The identity fields exposed alongside a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySummary {
    pub id: DbId,
    /// `None` when the directory no longer knows this id.
    pub email: Option<String>,
}

/// One listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    pub id: DbId,
    pub image_ref: String,
    pub student: IdentitySummary,
    pub submitted_at: Timestamp,
    pub status: SubmissionStatus,
    pub psychologist: Option<IdentitySummary>,
    pub assigned_at: Option<Timestamp>,
    pub analysis: Option<Analysis>,
    pub evaluation: Option<Evaluation>,
}

/// Derived dashboard counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a SubmissionStatus>) -> Self {
        let mut counts = StatusCounts::default();
        for status in statuses {
            counts.total += 1;
            match status {
                SubmissionStatus::Submitted => counts.pending += 1,
                SubmissionStatus::Reviewed => counts.completed += 1,
                SubmissionStatus::Failed => counts.failed += 1,
                SubmissionStatus::InReview => {}
            }
        }
        counts
    }
}

/// A role view: ordered entries plus their aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub items: Vec<SubmissionView>,
    pub counts: StatusCounts,
}

/// Sort newest first, breaking timestamp ties by descending id.
pub fn sort_newest_first(submissions: &mut [Submission]) {
    submissions.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Every identity id a set of submissions refers to, without duplicates.
pub fn referenced_identities(submissions: &[Submission]) -> Vec<DbId> {
    let mut ids: Vec<DbId> = submissions
        .iter()
        .flat_map(|s| std::iter::once(s.student_id).chain(s.assigned_psychologist_id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn summarize(id: DbId, identities: &HashMap<DbId, Identity>) -> IdentitySummary {
    IdentitySummary {
        id,
        email: identities.get(&id).map(|i| i.email.clone()),
    }
}

/// Join one submission with its identities for the given scope.
pub fn project_one(
    submission: Submission,
    identities: &HashMap<DbId, Identity>,
    scope: ViewScope,
) -> SubmissionView {
    let details = scope.includes_details();
    SubmissionView {
        id: submission.id,
        student: summarize(submission.student_id, identities),
        psychologist: submission
            .assigned_psychologist_id
            .map(|id| summarize(id, identities)),
        image_ref: submission.image_ref,
        submitted_at: submission.submitted_at,
        status: submission.status,
        assigned_at: submission.assigned_at,
        analysis: if details { submission.analysis } else { None },
        evaluation: if details { submission.evaluation } else { None },
    }
}

/// Build a full listing: order, join, count.
pub fn project(
    mut submissions: Vec<Submission>,
    identities: &HashMap<DbId, Identity>,
    scope: ViewScope,
) -> Listing {
    sort_newest_first(&mut submissions);
    let counts = StatusCounts::tally(submissions.iter().map(|s| &s.status));
    let items = submissions
        .into_iter()
        .map(|s| project_one(s, identities, scope))
        .collect();
    Listing { items, counts }
}

/// Default item for a review screen: the first `in_review` entry, else the
/// first entry overall.
///
/// This is a presentation convenience for clients; it relies only on the
/// listing order above.
pub fn default_review_selection(items: &[SubmissionView]) -> Option<&SubmissionView> {
    items
        .iter()
        .find(|v| v.status == SubmissionStatus::InReview)
        .or_else(|| items.first())
}
