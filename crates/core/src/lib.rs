//! Pluto core: domain types and the assessment workflow engine.
//!
//! - [`assessment`] -- the `Submission` aggregate and its state machine.
//! - [`workflow`] -- the engine, assignment coordinator, role views, and
//!   the store/directory seams it runs against.

pub mod assessment;
pub mod error;
pub mod roles;
pub mod types;
pub mod workflow;
