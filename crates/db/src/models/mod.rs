//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - Conversions into the `pluto_core` domain types

pub mod submission;
pub mod user;
