//! PostgreSQL-backed implementations of the engine's seams.
//!
//! `update_exclusive` runs inside a transaction that takes the submission's
//! row lock with `SELECT ... FOR UPDATE`. Competing transitions on the same
//! row queue behind that lock; other rows are unaffected.

use async_trait::async_trait;
use pluto_core::assessment::{NewSubmission, Submission};
use pluto_core::error::CoreError;
use pluto_core::roles::Role;
use pluto_core::types::DbId;
use pluto_core::workflow::{
    Credentials, Identity, IdentityDirectory, SubmissionFilter, SubmissionStore, Transition,
};
use sqlx::PgPool;

use crate::models::submission::{CreateSubmission, SubmissionRow, SubmissionState};
use crate::models::user::{CreateUser, User};
use crate::repositories::{SubmissionRepo, UserRepo};

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return CoreError::Conflict(db.message().to_string());
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(format!("Database error: {err}"))
}

fn rows_into_domain(rows: Vec<SubmissionRow>) -> Result<Vec<Submission>, CoreError> {
    rows.into_iter().map(SubmissionRow::into_domain).collect()
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn insert(&self, input: NewSubmission) -> Result<Submission, CoreError> {
        let row = SubmissionRepo::create(
            &self.pool,
            &CreateSubmission {
                student_id: input.student_id,
                image_ref: input.image_ref,
                submitted_at: input.submitted_at,
            },
        )
        .await
        .map_err(map_db_error)?;
        row.into_domain()
    }

    async fn get(&self, id: DbId) -> Result<Option<Submission>, CoreError> {
        SubmissionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(SubmissionRow::into_domain)
            .transpose()
    }

    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, CoreError> {
        let rows = match filter {
            SubmissionFilter::All => SubmissionRepo::list_all(&self.pool).await,
            SubmissionFilter::Student(id) => SubmissionRepo::list_for_student(&self.pool, id).await,
            SubmissionFilter::Psychologist(id) => {
                SubmissionRepo::list_for_psychologist(&self.pool, id).await
            }
        }
        .map_err(map_db_error)?;
        rows_into_domain(rows)
    }

    async fn update_exclusive(
        &self,
        id: DbId,
        transition: Transition,
    ) -> Result<Submission, CoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let current = SubmissionRepo::find_for_update(&mut *tx, id)
            .await
            .map_err(map_db_error)?
            .ok_or(CoreError::NotFound {
                entity: "Submission",
                id,
            })?
            .into_domain()?;

        // A failed transition drops `tx`, which rolls back and releases the lock.
        let next = transition(&current)?;
        if next.id != current.id {
            return Err(CoreError::Internal(
                "Transition changed the submission id".to_string(),
            ));
        }

        let saved = SubmissionRepo::save_state(&mut *tx, &SubmissionState::from_domain(&next))
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;

        saved.into_domain()
    }
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgIdentityDirectory {
    pool: PgPool,
}

impl PgIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PgIdentityDirectory {
    async fn find(&self, id: DbId) -> Result<Option<Identity>, CoreError> {
        UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(User::into_identity)
            .transpose()
    }

    async fn find_many(&self, ids: &[DbId]) -> Result<Vec<Identity>, CoreError> {
        UserRepo::find_many(&self.pool, ids)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(User::into_identity)
            .collect()
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, CoreError> {
        UserRepo::find_by_email(&self.pool, email)
            .await
            .map_err(map_db_error)?
            .map(User::into_credentials)
            .transpose()
    }

    async fn register(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Identity, CoreError> {
        let input = CreateUser {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        };
        UserRepo::create(&self.pool, &input)
            .await
            .map_err(|e| match map_db_error(e) {
                CoreError::Conflict(_) => {
                    CoreError::Conflict(format!("Email '{email}' is already registered"))
                }
                other => other,
            })?
            .into_identity()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Identity>, CoreError> {
        UserRepo::list_by_role(&self.pool, role)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(User::into_identity)
            .collect()
    }
}
