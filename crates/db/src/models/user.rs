//! User entity model and DTOs.

use pluto_core::error::CoreError;
use pluto_core::roles::Role;
use pluto_core::types::{DbId, Timestamp};
use pluto_core::workflow::{Credentials, Identity};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Convert to [`Identity`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new user.
#[derive(Debug)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub fn into_identity(self) -> Result<Identity, CoreError> {
        Ok(Identity {
            id: self.id,
            role: self.role.parse().map_err(|_| {
                CoreError::Internal(format!("User {} has unknown role '{}'", self.id, self.role))
            })?,
            email: self.email,
            created_at: self.created_at,
        })
    }

    pub fn into_credentials(self) -> Result<Credentials, CoreError> {
        let password_hash = self.password_hash.clone();
        Ok(Credentials {
            identity: self.into_identity()?,
            password_hash,
        })
    }
}
