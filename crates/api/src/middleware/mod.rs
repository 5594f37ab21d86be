//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the caller from a JWT Bearer token.
//! - [`rbac::RequireStudent`], [`rbac::RequireFacilitator`],
//!   [`rbac::RequirePsychologist`] -- Require one specific role.

pub mod auth;
pub mod rbac;
