//! Optional entity capabilities.
//!
//! Capabilities are checked, not enforced: the helpers below produce
//! validation results an entity can return from `Entity::evaluate`, and
//! depots expose capability-specific lookups through trait bounds.

use crate::model::entity::Entity;
use crate::validation::{length_between, PropertyValidationResult};
use uuid::Uuid;

pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const REFERENCE_CHARS: usize = 8;

/// Entity identified by a unique human-readable name.
pub trait Named: Entity {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str>;
}

/// Entity identified by a fixed-length external code that survives store
/// migrations.
pub trait Referenced: Entity {
    fn reference(&self) -> &str;
}

/// Entity that can be switched on and off without deletion.
pub trait Activable: Entity {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);
}

/// Catalog entries carry every capability.
pub trait Catalog: Named + Referenced + Activable {}

impl<T: Named + Referenced + Activable> Catalog for T {}

/// Length rules for `name` (1..=100) and `description` (0..=200).
pub fn evaluate_named<E: Named>(entity: &E) -> Vec<PropertyValidationResult> {
    vec![
        length_between("name", entity.name(), 1, NAME_MAX_CHARS),
        length_between(
            "description",
            entity.description().unwrap_or_default(),
            0,
            DESCRIPTION_MAX_CHARS,
        ),
    ]
}

/// Exact-length rule for `reference`.
pub fn evaluate_referenced<E: Referenced>(entity: &E) -> Vec<PropertyValidationResult> {
    vec![length_between(
        "reference",
        entity.reference(),
        REFERENCE_CHARS,
        REFERENCE_CHARS,
    )]
}

/// Generates a random uppercase reference of `REFERENCE_CHARS` characters.
pub fn generate_reference() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(REFERENCE_CHARS)
        .collect::<String>()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::{generate_reference, REFERENCE_CHARS};

    #[test]
    fn generated_references_have_fixed_length() {
        let first = generate_reference();
        let second = generate_reference();

        assert_eq!(first.chars().count(), REFERENCE_CHARS);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
