//! Core rules for voter registration and ballot casting.
//! Every invariant on registrations, ballots and protected records is
//! enforced here; binaries stay thin.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::PollbookConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{init_from_config, init_logging, logging_status, LogLevel};
pub use model::ballot::VoteChoice;
pub use model::ids::{CenterCode, FolkId, PollCode};
pub use repo::error::{RepoError, RepoResult};
pub use service::ballot_service::{
    run_cast_phases, BallotService, CastKind, CastOutcome, CastRequest,
};
pub use service::center_resolver::{CenterCheck, CenterResolver};
pub use service::registration_service::{
    registration_validity, RegistrationRequest, RegistrationService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
