//! Core business logic - framework-agnostic operations over a database connection.
//!
//! Every function takes the acting school's id explicitly and never reads rows of
//! another school. Authorization happens in the API layer before these are called.

pub mod attendance;
pub mod course;
pub mod credit;
pub mod package;
pub mod report;
pub mod school;
pub mod student;
pub mod user;
