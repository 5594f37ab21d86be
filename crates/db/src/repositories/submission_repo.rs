//! Repository for the `submissions` table.
//!
//! Reads go straight to the pool. State changes go through
//! [`SubmissionRepo::find_for_update`] and [`SubmissionRepo::save_state`] on
//! the same connection, inside a transaction owned by the caller.

use pluto_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::submission::{CreateSubmission, SubmissionRow, SubmissionState};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, student_id, image_ref, status, submitted_at, \
                       psychologist_id, assigned_at, \
                       analysis_state, analysis_text, analysis_data, analysis_error, \
                       analysis_requested_at, analysis_reported_at, \
                       evaluation_notes, evaluated_at, created_at, updated_at";

/// Newest first, id breaks ties.
const ORDER: &str = "ORDER BY submitted_at DESC, id DESC";

pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Insert a new submission in status `submitted`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSubmission,
    ) -> Result<SubmissionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO submissions (student_id, image_ref, submitted_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(input.student_id)
            .bind(&input.image_ref)
            .bind(input.submitted_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE id = $1");
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Read one submission and hold its row lock until the enclosing
    /// transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<SubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Overwrite every mutable column with `state`.
    pub async fn save_state(
        conn: &mut PgConnection,
        state: &SubmissionState,
    ) -> Result<SubmissionRow, sqlx::Error> {
        let query = format!(
            "UPDATE submissions SET
                status = $2,
                psychologist_id = $3,
                assigned_at = $4,
                analysis_state = $5,
                analysis_text = $6,
                analysis_data = $7,
                analysis_error = $8,
                analysis_requested_at = $9,
                analysis_reported_at = $10,
                evaluation_notes = $11,
                evaluated_at = $12
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(state.id)
            .bind(&state.status)
            .bind(state.psychologist_id)
            .bind(state.assigned_at)
            .bind(&state.analysis_state)
            .bind(&state.analysis_text)
            .bind(&state.analysis_data)
            .bind(&state.analysis_error)
            .bind(state.analysis_requested_at)
            .bind(state.analysis_reported_at)
            .bind(&state.evaluation_notes)
            .bind(state.evaluated_at)
            .fetch_one(conn)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<SubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions {ORDER}");
        sqlx::query_as::<_, SubmissionRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<SubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE student_id = $1 {ORDER}");
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_psychologist(
        pool: &PgPool,
        psychologist_id: DbId,
    ) -> Result<Vec<SubmissionRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM submissions WHERE psychologist_id = $1 {ORDER}");
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(psychologist_id)
            .fetch_all(pool)
            .await
    }
}
