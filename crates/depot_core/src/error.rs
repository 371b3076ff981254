//! Depot error taxonomy.
//!
//! # Invariants
//! - Single-item operations surface these errors unchanged.
//! - Batch operations wrap them per item in `EntityError`.

use crate::db::DbError;
use crate::validation::EntityValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DepotResult<T> = Result<T, DepotError>;

/// Error raised by sessions, the query pipeline, the reconciler and depots.
#[derive(Debug)]
pub enum DepotError {
    /// Lookup by id or filter found nothing.
    NotFound { set: &'static str, search: String },
    /// Update received an unsaved entity while creation was disabled.
    CreateDisabled { set: &'static str },
    /// Relation value is malformed or points at an unsaved dependency.
    IntegrityViolation {
        set: &'static str,
        relation: &'static str,
        reason: String,
    },
    /// Declarative validation failed while running in strict mode.
    Validation(EntityValidationError),
    /// Ordering or filtering referenced a property the entity does not have.
    PropertyNotFound { set: &'static str, property: String },
    /// Caller supplied arguments outside the accepted domain.
    InvalidInput(String),
    /// Persisted state cannot be decoded or does not match its entity type.
    InvalidData(String),
    /// Store transport failure.
    Db(DbError),
}

impl DepotError {
    pub(crate) fn not_found(set: &'static str, search: impl Into<String>) -> Self {
        Self::NotFound {
            set,
            search: search.into(),
        }
    }

    pub(crate) fn integrity(
        set: &'static str,
        relation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::IntegrityViolation {
            set,
            relation,
            reason: reason.into(),
        }
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::CreateDisabled { .. } => "create_disabled",
            Self::IntegrityViolation { .. } => "integrity_violation",
            Self::Validation(_) => "validation_failure",
            Self::PropertyNotFound { .. } => "property_not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Db(_) => "store_failure",
        }
    }
}

impl Display for DepotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { set, search } => write!(f, "{set} not found: {search}"),
            Self::CreateDisabled { set } => {
                write!(f, "{set} entity is not persisted and creation is disabled")
            }
            Self::IntegrityViolation {
                set,
                relation,
                reason,
            } => write!(f, "integrity violation on {set}.{relation}: {reason}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::PropertyNotFound { set, property } => {
                write!(f, "property `{property}` does not exist on {set}")
            }
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DepotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::CreateDisabled { .. }
            | Self::IntegrityViolation { .. }
            | Self::PropertyNotFound { .. }
            | Self::InvalidInput(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for DepotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for DepotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EntityValidationError> for DepotError {
    fn from(value: EntityValidationError) -> Self {
        Self::Validation(value)
    }
}
