pub mod analysis;
pub mod assessments;
pub mod auth;
pub mod psychologists;
pub mod submissions;
