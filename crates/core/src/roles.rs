//! Platform roles.
//!
//! The string forms must match the `CHECK` constraint on `users.role`
//! in `20260301000001_create_users.sql`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_FACILITATOR: &str = "facilitator";
pub const ROLE_PSYCHOLOGIST: &str = "psychologist";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_STUDENT, ROLE_FACILITATOR, ROLE_PSYCHOLOGIST];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Facilitator,
    Psychologist,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => ROLE_STUDENT,
            Role::Facilitator => ROLE_FACILITATOR,
            Role::Psychologist => ROLE_PSYCHOLOGIST,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_STUDENT => Ok(Role::Student),
            ROLE_FACILITATOR => Ok(Role::Facilitator),
            ROLE_PSYCHOLOGIST => Ok(Role::Psychologist),
            other => Err(CoreError::InvalidInput(format!(
                "Invalid role '{other}'. Must be one of: {}",
                VALID_ROLES.join(", ")
            ))),
        }
    }
}

/// A verified caller identity as handed to the workflow engine.
///
/// The engine never authenticates; it trusts whatever produced this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: DbId,
    pub role: Role,
}

impl Caller {
    pub fn new(id: DbId, role: Role) -> Self {
        Self { id, role }
    }

    /// Fail with `Unauthorized` unless the caller holds `role`.
    pub fn require(&self, role: Role) -> Result<(), CoreError> {
        if self.role != role {
            return Err(CoreError::Unauthorized(format!(
                "{} role required",
                role.as_str()
            )));
        }
        Ok(())
    }
}
