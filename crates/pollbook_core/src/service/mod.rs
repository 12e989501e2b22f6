//! Use-case services over the SQLite repositories.
//!
//! # Responsibility
//! - Registration creation with validity stamping.
//! - Closest-center resolution and registration cross-checks.
//! - Ballot casting as one atomic unit.

pub mod ballot_service;
pub mod center_resolver;
pub mod registration_service;
