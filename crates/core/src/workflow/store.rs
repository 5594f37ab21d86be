//! Persistence and identity seams consumed by the engine.
//!
//! Both traits are object-safe so the engine can hold them as
//! `Arc<dyn ...>` and run unchanged over PostgreSQL or in memory.

use async_trait::async_trait;
use serde::Serialize;

use crate::assessment::{NewSubmission, Submission};
use crate::error::CoreError;
use crate::roles::Role;
use crate::types::{DbId, Timestamp};

/// A state transition run inside a submission's exclusive section.
///
/// Receives the current state and returns the next state, or an error that
/// aborts the update and leaves the stored submission untouched.
pub type Transition = Box<dyn FnOnce(&Submission) -> Result<Submission, CoreError> + Send>;

/// Which submissions a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionFilter {
    All,
    Student(DbId),
    Psychologist(DbId),
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        match *self {
            SubmissionFilter::All => true,
            SubmissionFilter::Student(id) => submission.student_id == id,
            SubmissionFilter::Psychologist(id) => submission.assigned_psychologist_id == Some(id),
        }
    }
}

/// The shared Submission store.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persist a new submission in status `submitted`, assigning its id.
    async fn insert(&self, input: NewSubmission) -> Result<Submission, CoreError>;

    /// Point-in-time read of one submission.
    async fn get(&self, id: DbId) -> Result<Option<Submission>, CoreError>;

    /// Point-in-time read of every submission matching `filter`, in no
    /// particular order.
    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, CoreError>;

    /// Apply `transition` to one submission while holding that submission's
    /// exclusive section, persisting the result only if it succeeds.
    ///
    /// Two concurrent calls for the same id are serialized; calls for
    /// different ids never wait on each other. Fails with `NotFound` when
    /// the id is unknown.
    async fn update_exclusive(
        &self,
        id: DbId,
        transition: Transition,
    ) -> Result<Submission, CoreError>;
}

/// A platform user as known to the Identity Directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: DbId,
    pub email: String,
    pub role: Role,
    pub created_at: Timestamp,
}

/// An identity together with its stored password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identity: Identity,
    pub password_hash: String,
}

/// Resolves identities and roles for the engine and the auth layer.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find(&self, id: DbId) -> Result<Option<Identity>, CoreError>;

    /// Resolve several ids at once. Unknown ids are simply absent from the result.
    async fn find_many(&self, ids: &[DbId]) -> Result<Vec<Identity>, CoreError>;

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, CoreError>;

    /// Create a user. Fails with `Conflict` when the email is taken.
    async fn register(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Identity, CoreError>;

    /// All users holding `role`, ordered by email.
    async fn list_by_role(&self, role: Role) -> Result<Vec<Identity>, CoreError>;
}
