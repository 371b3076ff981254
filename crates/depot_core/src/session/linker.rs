//! Re-points embedded relation values at the identity map.
//!
//! # Invariants
//! - Only persisted, tracked, non-deleted related entities are replaced.
//! - Cycles are cut at the first revisit, like the loader does.

use super::schema::Schema;
use super::tracker::{EntryState, Tracker};
use crate::error::DepotResult;
use crate::model::entity::{Entity, EntityId};
use std::collections::HashSet;

pub(crate) struct Linker<'a> {
    tracker: &'a Tracker,
    schema: &'a Schema,
    visiting: HashSet<(&'static str, EntityId)>,
}

impl<'a> Linker<'a> {
    pub fn new(tracker: &'a Tracker, schema: &'a Schema) -> Self {
        Self {
            tracker,
            schema,
            visiting: HashSet::new(),
        }
    }

    /// Replaces every related value of `value` with its tracked state.
    pub fn relink<T: Entity>(&mut self, value: &mut T) -> DepotResult<()> {
        let key = (T::SET, value.id());
        if !self.visiting.insert(key) {
            return Ok(());
        }

        let schema = self.schema;
        let relations = schema.relations::<T>()?;
        let mut relinked = Ok(());
        for relation in relations.iter() {
            relinked = relation.relink(value, self);
            if relinked.is_err() {
                break;
            }
        }
        self.visiting.remove(&key);
        relinked
    }

    /// Tracked state of `(T::SET, id)` with its own relations relinked.
    pub fn current<T: Entity>(&mut self, id: EntityId) -> DepotResult<Option<T>> {
        if self.visiting.contains(&(T::SET, id)) {
            return Ok(None);
        }
        let Some((state, mut value)) = self.tracker.tracked::<T>(id)? else {
            return Ok(None);
        };
        if state == EntryState::Deleted {
            return Ok(None);
        }
        self.relink(&mut value)?;
        Ok(Some(value))
    }
}
