//! Repository implementations for database access.

pub mod submission_repo;
pub mod user_repo;

pub use submission_repo::SubmissionRepo;
pub use user_repo::UserRepo;
