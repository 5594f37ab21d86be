//! The Assessment Workflow Engine.
//!
//! - [`store`] -- the seams the engine runs against (submission store,
//!   identity directory).
//! - [`assignment`] -- single and batch assignment with per-submission
//!   mutual exclusion.
//! - [`engine`] -- create, analysis reporting, evaluation and queries.
//! - [`views`] -- role-scoped projections and aggregate counts.
//! - [`memory`] -- in-memory seam implementations.

pub mod assignment;
pub mod engine;
pub mod memory;
pub mod store;
pub mod views;

pub use assignment::{AssignmentCoordinator, BatchAssignReport, BatchFailure};
pub use engine::AssessmentEngine;
pub use store::{Credentials, Identity, IdentityDirectory, SubmissionFilter, SubmissionStore, Transition};
pub use views::{IdentitySummary, Listing, StatusCounts, SubmissionView, ViewScope};
