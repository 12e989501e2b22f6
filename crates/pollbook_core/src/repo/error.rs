//! Repository error shared by every SQLite repository.

use crate::db::DbError;
use crate::model::error::ValidationError;
use crate::repo::guard::ProtectedRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence failures, split into caller-meaningful kinds.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before it reached SQL.
    Validation(ValidationError),
    /// Transport or unexpected SQLite failure.
    Db(DbError),
    /// Target row does not exist.
    NotFound { entity: &'static str, key: String },
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    Conflict(String),
    /// A FOREIGN KEY constraint rejected the write (missing parent or
    /// surviving children).
    ReferenceViolation(String),
    /// Mutation guard refused to touch a record with dependents.
    Protected(ProtectedRecord),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl RepoError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict(details) => write!(f, "uniqueness conflict: {details}"),
            Self::ReferenceViolation(details) => write!(f, "reference violation: {details}"),
            Self::Protected(record) => write!(f, "protected record: {record}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_uniqueness_violation() {
            Self::Conflict(value.to_string())
        } else if value.is_foreign_key_violation() {
            Self::ReferenceViolation(value.to_string())
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}
