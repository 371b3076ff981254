//! Batch executor.
//!
//! # Responsibility
//! - Run a single-item operation over many inputs in input order.
//! - Either isolate per-item failures or stop at the first one.
//!
//! # Invariants
//! - `successes + failures == operations` for isolated runs.
//! - Fail-fast runs return the first item's error unchanged.

use crate::error::{DepotError, DepotResult};
use crate::logging::{sanitize_message, MAX_LOGGED_ERROR_CHARS};
use log::warn;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Operation that produced a per-item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityErrorKind {
    CreateFailed,
    ReadFailed,
    ReadValidationFailed,
    UpdateFailed,
    DeleteFailed,
}

impl EntityErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateFailed => "create_failed",
            Self::ReadFailed => "read_failed",
            Self::ReadValidationFailed => "read_validation_failed",
            Self::UpdateFailed => "update_failed",
            Self::DeleteFailed => "delete_failed",
        }
    }
}

/// Failure of one batch item: kind, offending entity and cause.
#[derive(Debug)]
pub struct EntityError<E> {
    pub kind: EntityErrorKind,
    pub entity: E,
    pub cause: DepotError,
}

impl<E> EntityError<E> {
    pub fn new(kind: EntityErrorKind, entity: E, cause: DepotError) -> Self {
        Self {
            kind,
            entity,
            cause,
        }
    }
}

impl<E> Display for EntityError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.cause)
    }
}

impl<E: Debug> Error for EntityError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

/// Aggregated outcome of a batch run.
#[derive(Debug)]
pub struct BatchOperationOutput<E> {
    successes: Vec<E>,
    failures: Vec<EntityError<E>>,
}

impl<E> Default for BatchOperationOutput<E> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<E> BatchOperationOutput<E> {
    pub fn successes(&self) -> &[E] {
        &self.successes
    }

    pub fn failures(&self) -> &[EntityError<E>] {
        &self.failures
    }

    pub fn operations_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn successes_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failures_count(&self) -> usize {
        self.failures.len()
    }

    /// At least one item failed.
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Every item failed. Vacuously true for an empty batch.
    pub fn full_failed(&self) -> bool {
        self.failures.len() == self.operations_count()
    }

    pub fn into_parts(self) -> (Vec<E>, Vec<EntityError<E>>) {
        (self.successes, self.failures)
    }

    pub(crate) fn push_success(&mut self, entity: E) {
        self.successes.push(entity);
    }

    pub(crate) fn push_failure(&mut self, failure: EntityError<E>) {
        self.failures.push(failure);
    }
}

/// Runs one operation per item, tagging failures with `kind`.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    kind: EntityErrorKind,
    sync: bool,
}

impl BatchExecutor {
    pub fn new(kind: EntityErrorKind, sync: bool) -> Self {
        Self { kind, sync }
    }

    /// Executor that captures failures and keeps going.
    pub fn isolated(kind: EntityErrorKind) -> Self {
        Self::new(kind, false)
    }

    /// Applies `operation` to every item in order.
    ///
    /// `subject` turns an input item into the entity reported with its
    /// failure.
    ///
    /// # Errors
    /// - With `sync`, the first item error, unchanged. Later items never run.
    pub fn execute<I, E>(
        &self,
        items: impl IntoIterator<Item = I>,
        mut operation: impl FnMut(&I) -> DepotResult<E>,
        subject: impl Fn(I) -> E,
    ) -> DepotResult<BatchOperationOutput<E>> {
        let mut output = BatchOperationOutput::default();

        for item in items {
            match operation(&item) {
                Ok(entity) => output.push_success(entity),
                Err(cause) if self.sync => return Err(cause),
                Err(cause) => {
                    warn!(
                        "event=batch_item module=batch status=error kind={} error_code={} error={}",
                        self.kind.as_str(),
                        cause.code(),
                        sanitize_message(&cause.to_string(), MAX_LOGGED_ERROR_CHARS)
                    );
                    output.push_failure(EntityError::new(self.kind, subject(item), cause));
                }
            }
        }

        Ok(output)
    }
}
