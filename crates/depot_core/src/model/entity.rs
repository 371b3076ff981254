//! Entity contract shared by every depot-managed type.
//!
//! # Invariants
//! - `id <= 0` means the entity has never been persisted.
//! - `SET` is unique per entity type inside one store.
//! - Serialized property names are the names used by orderings and
//!   property filters.

use crate::model::relation::Relation;
use crate::validation::{PropertyValidationResult, ValidationTrigger};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned numeric identity.
pub type EntityId = i64;

/// A persisted record type handled by a `Depot`.
pub trait Entity: Clone + Debug + Default + Serialize + DeserializeOwned + 'static {
    /// Set name the entity's rows are stored under.
    const SET: &'static str;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    /// Creation timestamp in epoch milliseconds.
    fn timestamp(&self) -> i64;

    fn set_timestamp(&mut self, timestamp: i64);

    /// Relation descriptors of this type.
    ///
    /// Called once per type and session; the session caches the result.
    fn relations() -> Vec<Relation<Self>> {
        Vec::new()
    }

    /// Declarative validation hook invoked on reads and writes.
    fn evaluate(&self, _trigger: ValidationTrigger) -> Vec<PropertyValidationResult> {
        Vec::new()
    }

    fn is_persisted(&self) -> bool {
        self.id() > 0
    }
}

/// Builds a default entity carrying only `id`.
pub fn with_id<E: Entity>(id: EntityId) -> E {
    let mut entity = E::default();
    entity.set_id(id);
    entity
}

/// Current wall clock in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

/// Serialized property names of `E`, taken from its default instance.
pub fn property_names<E: Entity>() -> Vec<String> {
    match serde_json::to_value(E::default()) {
        Ok(Value::Object(map)) => map.into_iter().map(|(key, _)| key).collect(),
        _ => Vec::new(),
    }
}

/// Reads one serialized property of `entity`.
pub fn field_value<E: Entity>(entity: &E, property: &str) -> Option<Value> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(mut map)) => map.remove(property),
        _ => None,
    }
}
