//! In-memory implementations of the engine's seams.
//!
//! Used by tests and by local runs without a database. Each submission sits
//! behind its own `Mutex`; the outer `RwLock` only guards the id map and is
//! never held while a transition runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::assessment::{NewSubmission, Submission, SubmissionStatus};
use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;
use crate::workflow::store::{
    Credentials, Identity, IdentityDirectory, SubmissionFilter, SubmissionStore, Transition,
};

// ---------------------------------------------------------------------------
// Submission store
// ---------------------------------------------------------------------------

pub struct InMemorySubmissionStore {
    next_id: AtomicI64,
    entries: RwLock<HashMap<DbId, Arc<Mutex<Submission>>>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, id: DbId) -> Option<Arc<Mutex<Submission>>> {
        self.entries.read().await.get(&id).cloned()
    }
}

impl Default for InMemorySubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn insert(&self, input: NewSubmission) -> Result<Submission, CoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let submission = Submission {
            id,
            student_id: input.student_id,
            image_ref: input.image_ref,
            status: SubmissionStatus::Submitted,
            submitted_at: input.submitted_at,
            assigned_psychologist_id: None,
            assigned_at: None,
            analysis: None,
            evaluation: None,
        };
        self.entries
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(submission.clone())));
        Ok(submission)
    }

    async fn get(&self, id: DbId) -> Result<Option<Submission>, CoreError> {
        match self.entry(id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, CoreError> {
        let entries: Vec<_> = self.entries.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let submission = entry.lock().await;
            if filter.matches(&submission) {
                out.push(submission.clone());
            }
        }
        Ok(out)
    }

    async fn update_exclusive(
        &self,
        id: DbId,
        transition: Transition,
    ) -> Result<Submission, CoreError> {
        let entry = self.entry(id).await.ok_or(CoreError::NotFound {
            entity: "Submission",
            id,
        })?;

        let mut current = entry.lock().await;
        let next = transition(&*current)?;
        if next.id != current.id {
            return Err(CoreError::Internal(format!(
                "Transition changed submission id {} to {}",
                current.id, next.id
            )));
        }
        *current = next.clone();
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Identity directory
// ---------------------------------------------------------------------------

pub struct InMemoryIdentityDirectory {
    next_id: AtomicI64,
    users: RwLock<HashMap<DbId, Credentials>>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryIdentityDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn find(&self, id: DbId) -> Result<Option<Identity>, CoreError> {
        Ok(self.users.read().await.get(&id).map(|c| c.identity.clone()))
    }

    async fn find_many(&self, ids: &[DbId]) -> Result<Vec<Identity>, CoreError> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|c| c.identity.clone()))
            .collect())
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, CoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|c| c.identity.email == email)
            .cloned())
    }

    async fn register(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Identity, CoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|c| c.identity.email == email) {
            return Err(CoreError::Conflict(format!(
                "Email '{email}' is already registered"
            )));
        }

        let identity = Identity {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            email: email.to_string(),
            role,
            created_at: chrono::Utc::now(),
        };
        users.insert(
            identity.id,
            Credentials {
                identity: identity.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(identity)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Identity>, CoreError> {
        let mut matching: Vec<Identity> = self
            .users
            .read()
            .await
            .values()
            .filter(|c| c.identity.role == role)
            .map(|c| c.identity.clone())
            .collect();
        matching.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(matching)
    }
}
