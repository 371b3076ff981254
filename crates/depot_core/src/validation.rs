//! Declarative validation invocation contract.
//!
//! # Responsibility
//! - Carry per-property validation results out of `Entity::evaluate`.
//! - Decide whether a failed evaluation aborts a depot operation.
//!
//! # Invariants
//! - `ValidationMode::BestEffort` never aborts; failures are logged only.
//! - Rules themselves live on entity types, not here.

use crate::model::entity::Entity;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which side of the depot asked for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTrigger {
    Read,
    Write,
}

impl ValidationTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// How a depot reacts to failed evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Log failures and keep going.
    #[default]
    BestEffort,
    /// Turn failures into `DepotError::Validation`.
    Strict,
}

/// One rule violation on one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorError {
    pub rule: &'static str,
    pub message: String,
}

/// All violations collected for one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValidationResult {
    pub property: &'static str,
    pub errors: Vec<ValidatorError>,
}

impl PropertyValidationResult {
    pub fn new(property: &'static str) -> Self {
        Self {
            property,
            errors: Vec::new(),
        }
    }

    /// Records a violation when `valid` is false.
    pub fn check(&mut self, valid: bool, rule: &'static str, message: impl Into<String>) {
        if !valid {
            self.errors.push(ValidatorError {
                rule,
                message: message.into(),
            });
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Evaluation failure for one entity instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityValidationError {
    pub set: &'static str,
    pub trigger: ValidationTrigger,
    pub results: Vec<PropertyValidationResult>,
}

impl EntityValidationError {
    /// Names of the properties that failed, in evaluation order.
    pub fn properties(&self) -> Vec<&'static str> {
        self.results.iter().map(|result| result.property).collect()
    }
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} validation failed on [{}]",
            self.set,
            self.trigger.as_str(),
            self.properties().join(", ")
        )
    }
}

impl Error for EntityValidationError {}

/// Runs the entity's own evaluation and keeps only failing properties.
pub fn evaluate<E: Entity>(
    entity: &E,
    trigger: ValidationTrigger,
) -> Result<(), EntityValidationError> {
    let results: Vec<_> = entity
        .evaluate(trigger)
        .into_iter()
        .filter(|result| !result.is_valid())
        .collect();

    if results.is_empty() {
        return Ok(());
    }

    Err(EntityValidationError {
        set: E::SET,
        trigger,
        results,
    })
}

/// Character-count check shared by capability rules.
pub fn length_between(
    property: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> PropertyValidationResult {
    let mut result = PropertyValidationResult::new(property);
    let length = value.chars().count();
    result.check(
        (min..=max).contains(&length),
        "length",
        format!("length {length} outside {min}..={max}"),
    );
    result
}
