//! Domain model for voter registration and ballot casting.
//!
//! # Responsibility
//! - Define validated identifiers and the records persisted by the store.
//! - Keep closed specializations (place kind, staff role, vote choice) as
//!   enums rather than open hierarchies.
//!
//! # Invariants
//! - Identifier newtypes can only hold values that passed validation.

pub mod ballot;
pub mod error;
pub mod folk;
pub mod ids;
pub mod place;
pub mod poll;
pub mod registration;
