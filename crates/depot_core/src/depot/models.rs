//! Depot inputs, outputs and options.

use crate::validation::ValidationMode;

/// How an update applies its replacement to the stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStrategy {
    /// Overwrite the stored entity; relations must reference persisted
    /// entities.
    #[default]
    Replace,
    /// Merge into the tracked graph; new children are created, omitted ones
    /// are kept.
    Merge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInput<E> {
    pub entity: E,
    /// Create the entity when it is unsaved or missing.
    pub create: bool,
    pub strategy: UpdateStrategy,
}

impl<E> UpdateInput<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            create: false,
            strategy: UpdateStrategy::Replace,
        }
    }

    pub fn or_create(mut self) -> Self {
        self.create = true;
        self
    }

    pub fn merged(mut self) -> Self {
        self.strategy = UpdateStrategy::Merge;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutput<E> {
    /// Stored state before the update; `None` when the call created it.
    pub original: Option<E>,
    pub updated: E,
}

impl<E> UpdateOutput<E> {
    pub fn created(updated: E) -> Self {
        Self {
            original: None,
            updated,
        }
    }

    pub fn was_created(&self) -> bool {
        self.original.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepotOptions {
    pub validation: ValidationMode,
}

impl DepotOptions {
    pub fn strict() -> Self {
        Self {
            validation: ValidationMode::Strict,
        }
    }
}
