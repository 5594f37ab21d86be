//! End-to-end tests for the assessment workflow engine.
//!
//! Runs the engine over the in-memory store and directory and exercises the
//! full lifecycle: creation, analysis, single and batch assignment,
//! evaluation, and the three role views.

use std::sync::Arc;

use assert_matches::assert_matches;
use pluto_core::assessment::{Analysis, AnalysisOutcome, SubmissionStatus};
use pluto_core::error::CoreError;
use pluto_core::roles::{Caller, Role};
use pluto_core::workflow::memory::{InMemoryIdentityDirectory, InMemorySubmissionStore};
use pluto_core::workflow::AssessmentEngine;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    engine: AssessmentEngine,
    student: Caller,
    other_student: Caller,
    facilitator: Caller,
    psych_a: Caller,
    psych_b: Caller,
}

async fn register(directory: &InMemoryIdentityDirectory, email: &str, role: Role) -> Caller {
    use pluto_core::workflow::IdentityDirectory;
    let identity = directory.register(email, "hash", role).await.unwrap();
    Caller::new(identity.id, identity.role)
}

async fn fixture() -> Fixture {
    let directory = Arc::new(InMemoryIdentityDirectory::new());
    let student = register(&directory, "harshit@example.com", Role::Student).await;
    let other_student = register(&directory, "soham@example.com", Role::Student).await;
    let facilitator = register(&directory, "ananth@example.com", Role::Facilitator).await;
    let psych_a = register(&directory, "ramesh@example.com", Role::Psychologist).await;
    let psych_b = register(&directory, "prakash@example.com", Role::Psychologist).await;

    let engine = AssessmentEngine::new(Arc::new(InMemorySubmissionStore::new()), directory);
    Fixture {
        engine,
        student,
        other_student,
        facilitator,
        psych_a,
        psych_b,
    }
}

fn analysis_ok(text: &str) -> AnalysisOutcome {
    AnalysisOutcome::Complete {
        text: text.to_string(),
        data: Some(serde_json::json!({ "final": text })),
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_submission_starts_submitted() {
    let f = fixture().await;
    let s = f
        .engine
        .create_submission(&f.student, "uploads/a.png")
        .await
        .unwrap();
    assert_eq!(s.status, SubmissionStatus::Submitted);
    assert_eq!(s.student_id, f.student.id);
    assert!(s.assigned_psychologist_id.is_none());
    assert!(s.analysis.is_none());
    assert!(s.evaluation.is_none());
}

#[tokio::test]
async fn test_only_students_create_submissions() {
    let f = fixture().await;
    let result = f.engine.create_submission(&f.facilitator, "uploads/a.png").await;
    assert_matches!(result, Err(CoreError::Unauthorized(_)));
}

#[tokio::test]
async fn test_empty_image_ref_rejected() {
    let f = fixture().await;
    let result = f.engine.create_submission(&f.student, "").await;
    assert_matches!(result, Err(CoreError::InvalidInput(_)));
}

// ---------------------------------------------------------------------------
// Full round trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_round_trip_reaches_reviewed_and_appears_in_all_views() {
    let f = fixture().await;
    let s = f
        .engine
        .create_submission(&f.student, "uploads/a.png")
        .await
        .unwrap();

    f.engine
        .report_analysis(s.id, analysis_ok("Large house, closed door."))
        .await
        .unwrap();
    f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await.unwrap();

    let notes = "Signs of guardedness; recommend follow-up.";
    let reviewed = f.engine.evaluate(&f.psych_a, s.id, notes).await.unwrap();
    assert_eq!(reviewed.status, SubmissionStatus::Reviewed);
    assert_eq!(reviewed.evaluation.as_ref().unwrap().notes, notes);
    assert_eq!(reviewed.assigned_psychologist_id, Some(f.psych_a.id));

    let facilitator_view = f.engine.list_for_facilitator(&f.facilitator).await.unwrap();
    let psych_view = f.engine.list_for_psychologist(&f.psych_a).await.unwrap();
    let student_view = f.engine.list_for_student(&f.student).await.unwrap();

    for listing in [&facilitator_view, &psych_view, &student_view] {
        assert_eq!(listing.items.len(), 1);
        let item = &listing.items[0];
        assert_eq!(item.id, s.id);
        assert_eq!(item.status, SubmissionStatus::Reviewed);
        assert_eq!(item.student.id, f.student.id);
        assert_eq!(item.student.email.as_deref(), Some("harshit@example.com"));
        assert_eq!(item.psychologist.as_ref().unwrap().id, f.psych_a.id);
        assert_eq!(item.submitted_at, s.submitted_at);
        assert_eq!(listing.counts.completed, 1);
    }

    for listing in [&psych_view, &student_view] {
        let item = &listing.items[0];
        assert_eq!(item.evaluation.as_ref().unwrap().notes, notes);
        assert_matches!(
            item.analysis,
            Some(Analysis::Complete { ref text, .. }) if text == "Large house, closed door."
        );
    }
    assert!(facilitator_view.items[0].evaluation.is_none());
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_second_assignment_fails_and_keeps_first() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();

    f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await.unwrap();
    let second = f.engine.assign(&f.facilitator, s.id, f.psych_b.id).await;
    assert_matches!(second, Err(CoreError::InvalidTransition { .. }));

    let view = f.engine.get_submission(&f.facilitator, s.id).await.unwrap();
    assert_eq!(view.psychologist.unwrap().id, f.psych_a.id);
    assert_eq!(view.status, SubmissionStatus::InReview);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_assignments_exactly_one_wins() {
    for _ in 0..20 {
        let f = fixture().await;
        let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();

        let engine_a = f.engine.clone();
        let engine_b = f.engine.clone();
        let facilitator = f.facilitator;
        let (psych_a, psych_b) = (f.psych_a.id, f.psych_b.id);

        let a = tokio::spawn(async move { engine_a.assign(&facilitator, s.id, psych_a).await });
        let b = tokio::spawn(async move { engine_b.assign(&facilitator, s.id, psych_b).await });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one assignment must succeed");

        let loser = if a.is_ok() { &b } else { &a };
        assert_matches!(loser, Err(CoreError::InvalidTransition { .. }));

        let winner_id = if a.is_ok() { psych_a } else { psych_b };
        let view = f.engine.get_submission(&f.facilitator, s.id).await.unwrap();
        assert_eq!(view.psychologist.unwrap().id, winner_id);
    }
}

#[tokio::test]
async fn test_assign_requires_facilitator() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    let result = f.engine.assign(&f.psych_a, s.id, f.psych_a.id).await;
    assert_matches!(result, Err(CoreError::Unauthorized(_)));
}

#[tokio::test]
async fn test_assign_to_non_psychologist_is_invalid_target() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();

    let to_student = f.engine.assign(&f.facilitator, s.id, f.other_student.id).await;
    assert_matches!(to_student, Err(CoreError::InvalidTarget(_)));

    let to_nobody = f.engine.assign(&f.facilitator, s.id, 9_999).await;
    assert_matches!(to_nobody, Err(CoreError::InvalidTarget(_)));

    let view = f.engine.get_submission(&f.facilitator, s.id).await.unwrap();
    assert_eq!(view.status, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn test_assign_unknown_submission_not_found() {
    let f = fixture().await;
    let result = f.engine.assign(&f.facilitator, 4_242, f.psych_a.id).await;
    assert_matches!(result, Err(CoreError::NotFound { id: 4_242, .. }));
}

#[tokio::test]
async fn test_batch_assign_reports_partial_success() {
    let f = fixture().await;
    let a = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    let b = f.engine.create_submission(&f.student, "b.png").await.unwrap();
    let c = f.engine.create_submission(&f.student, "c.png").await.unwrap();

    f.engine.assign(&f.facilitator, b.id, f.psych_b.id).await.unwrap();

    let report = f
        .engine
        .batch_assign(&f.facilitator, &[a.id, b.id, c.id], f.psych_a.id)
        .await
        .unwrap();

    assert_eq!(report.success_count, 2);
    assert_eq!(report.succeeded, vec![a.id, c.id]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, b.id);
    assert_eq!(report.failed[0].reason, "INVALID_TRANSITION");

    for id in [a.id, c.id] {
        let view = f.engine.get_submission(&f.facilitator, id).await.unwrap();
        assert_eq!(view.status, SubmissionStatus::InReview);
        assert_eq!(view.psychologist.unwrap().id, f.psych_a.id);
    }
    let b_view = f.engine.get_submission(&f.facilitator, b.id).await.unwrap();
    assert_eq!(b_view.psychologist.unwrap().id, f.psych_b.id);
}

#[tokio::test]
async fn test_batch_assign_reports_unknown_and_malformed_members() {
    let f = fixture().await;
    let a = f.engine.create_submission(&f.student, "a.png").await.unwrap();

    let report = f
        .engine
        .batch_assign(&f.facilitator, &[a.id, a.id, 777, -1], f.psych_a.id)
        .await
        .unwrap();

    assert_eq!(report.succeeded, vec![a.id]);
    let reasons: Vec<_> = report.failed.iter().map(|x| (x.id, x.reason)).collect();
    assert_eq!(reasons, vec![(777, "NOT_FOUND"), (-1, "INVALID_INPUT")]);
}

#[tokio::test]
async fn test_batch_assign_rejects_empty_set_and_bad_target() {
    let f = fixture().await;
    let a = f.engine.create_submission(&f.student, "a.png").await.unwrap();

    assert_matches!(
        f.engine.batch_assign(&f.facilitator, &[], f.psych_a.id).await,
        Err(CoreError::InvalidInput(_))
    );
    assert_matches!(
        f.engine.batch_assign(&f.facilitator, &[a.id], f.student.id).await,
        Err(CoreError::InvalidTarget(_))
    );
    assert_matches!(
        f.engine.batch_assign(&f.student, &[a.id], f.psych_a.id).await,
        Err(CoreError::Unauthorized(_))
    );
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_empty_notes_rejected_and_status_unchanged() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await.unwrap();

    let result = f.engine.evaluate(&f.psych_a, s.id, "").await;
    assert_matches!(result, Err(CoreError::InvalidInput(_)));

    let view = f.engine.get_submission(&f.psych_a, s.id).await.unwrap();
    assert_eq!(view.status, SubmissionStatus::InReview);
    assert!(view.evaluation.is_none());
}

#[tokio::test]
async fn test_non_assignee_cannot_evaluate() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await.unwrap();

    let result = f.engine.evaluate(&f.psych_b, s.id, "My notes").await;
    assert_matches!(result, Err(CoreError::Unauthorized(_)));

    let view = f.engine.get_submission(&f.psych_a, s.id).await.unwrap();
    assert_eq!(view.status, SubmissionStatus::InReview);
}

#[tokio::test]
async fn test_re_evaluation_is_invalid_transition() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await.unwrap();
    f.engine.evaluate(&f.psych_a, s.id, "first").await.unwrap();

    let again = f.engine.evaluate(&f.psych_a, s.id, "second").await;
    assert_matches!(again, Err(CoreError::InvalidTransition { .. }));

    let view = f.engine.get_submission(&f.student, s.id).await.unwrap();
    assert_eq!(view.evaluation.unwrap().notes, "first");
}

#[tokio::test]
async fn test_evaluate_before_assignment_is_invalid_transition() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    let result = f.engine.evaluate(&f.psych_a, s.id, "notes").await;
    assert_matches!(result, Err(CoreError::InvalidTransition { .. }));
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_analysis_fails_submission_and_blocks_assignment() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();

    f.engine
        .report_analysis(
            s.id,
            AnalysisOutcome::Failed {
                reason: "model unavailable".to_string(),
            },
        )
        .await
        .unwrap();

    let view = f.engine.get_submission(&f.student, s.id).await.unwrap();
    assert_eq!(view.status, SubmissionStatus::Failed);

    let assign = f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await;
    assert_matches!(assign, Err(CoreError::InvalidTransition { .. }));

    let counts = f.engine.list_for_facilitator(&f.facilitator).await.unwrap().counts;
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.pending, 0);
}

#[tokio::test]
async fn test_analysis_for_unknown_submission_is_dropped() {
    let f = fixture().await;
    let result = f.engine.report_analysis(31_337, analysis_ok("late")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_analysis_after_review_is_invalid_transition() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await.unwrap();
    f.engine.evaluate(&f.psych_a, s.id, "done").await.unwrap();

    let result = f.engine.report_analysis(s.id, analysis_ok("late")).await;
    assert_matches!(result, Err(CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_pending_analysis_is_visible_then_completed() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();

    f.engine.mark_analysis_requested(s.id).await.unwrap();
    let pending = f.engine.get_submission(&f.student, s.id).await.unwrap();
    assert_matches!(pending.analysis, Some(Analysis::Pending { .. }));

    f.engine.report_analysis(s.id, analysis_ok("ok")).await.unwrap();
    let done = f.engine.get_submission(&f.student, s.id).await.unwrap();
    assert_matches!(done.analysis, Some(Analysis::Complete { .. }));
    assert_eq!(done.status, SubmissionStatus::Submitted);
}

// ---------------------------------------------------------------------------
// Visibility and views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_visibility_follows_ownership_and_assignment() {
    let f = fixture().await;
    let s = f.engine.create_submission(&f.student, "a.png").await.unwrap();

    assert!(f.engine.get_submission(&f.student, s.id).await.is_ok());
    assert!(f.engine.get_submission(&f.facilitator, s.id).await.is_ok());
    assert_matches!(
        f.engine.get_submission(&f.other_student, s.id).await,
        Err(CoreError::Unauthorized(_))
    );
    assert_matches!(
        f.engine.get_submission(&f.psych_a, s.id).await,
        Err(CoreError::Unauthorized(_))
    );

    f.engine.assign(&f.facilitator, s.id, f.psych_a.id).await.unwrap();
    assert!(f.engine.get_submission(&f.psych_a, s.id).await.is_ok());
    assert!(f.engine.get_submission(&f.psych_b, s.id).await.is_err());
}

#[tokio::test]
async fn test_role_views_are_scoped() {
    let f = fixture().await;
    let mine = f.engine.create_submission(&f.student, "a.png").await.unwrap();
    let theirs = f.engine.create_submission(&f.other_student, "b.png").await.unwrap();
    f.engine.assign(&f.facilitator, theirs.id, f.psych_b.id).await.unwrap();

    let student_view = f.engine.list_for_student(&f.student).await.unwrap();
    assert_eq!(student_view.items.len(), 1);
    assert_eq!(student_view.items[0].id, mine.id);

    assert!(f.engine.list_for_psychologist(&f.psych_a).await.unwrap().items.is_empty());
    let psych_b_view = f.engine.list_for_psychologist(&f.psych_b).await.unwrap();
    assert_eq!(psych_b_view.items.len(), 1);
    assert_eq!(psych_b_view.items[0].id, theirs.id);

    let all = f.engine.list_for_facilitator(&f.facilitator).await.unwrap();
    assert_eq!(all.counts.total, 2);
    assert_eq!(all.counts.pending, 1);
    // Newest first.
    assert_eq!(all.items[0].id, theirs.id);

    assert_matches!(
        f.engine.list_for_facilitator(&f.student).await,
        Err(CoreError::Unauthorized(_))
    );
    assert_matches!(
        f.engine.list_for_student(&f.psych_a).await,
        Err(CoreError::Unauthorized(_))
    );
}

#[tokio::test]
async fn test_list_psychologists_for_facilitator() {
    let f = fixture().await;
    let psychologists = f.engine.list_psychologists(&f.facilitator).await.unwrap();
    let ids: Vec<_> = psychologists.iter().map(|p| p.id).collect();
    // Sorted by email: prakash < ramesh.
    assert_eq!(ids, vec![f.psych_b.id, f.psych_a.id]);

    assert_matches!(
        f.engine.list_psychologists(&f.student).await,
        Err(CoreError::Unauthorized(_))
    );
}
