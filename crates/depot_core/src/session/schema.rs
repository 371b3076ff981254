//! Per-session registry of entity types and their relation descriptors.

use crate::error::{DepotError, DepotResult};
use crate::model::entity::Entity;
use crate::model::relation::Relation;
use log::debug;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub(crate) struct Schema {
    relations: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    sets: RefCell<HashMap<&'static str, TypeId>>,
}

impl Schema {
    /// Returns cached relation descriptors of `E`, building them on first use.
    ///
    /// # Errors
    /// - `InvalidInput` when another entity type already claimed `E::SET`.
    pub fn relations<E: Entity>(&self) -> DepotResult<Rc<Vec<Relation<E>>>> {
        let type_id = TypeId::of::<E>();
        let cached = self.relations.borrow().get(&type_id).cloned();
        if let Some(cached) = cached {
            return cached.downcast::<Vec<Relation<E>>>().map_err(|_| {
                DepotError::InvalidData(format!("relation cache of `{}` is corrupted", E::SET))
            });
        }

        self.claim_set::<E>()?;
        let built = Rc::new(E::relations());
        debug!(
            "event=schema_register module=session status=ok set={} relations={}",
            E::SET,
            built.len()
        );
        self.relations.borrow_mut().insert(type_id, built.clone());
        Ok(built)
    }

    pub fn registered_sets(&self) -> Vec<&'static str> {
        let mut sets: Vec<_> = self.sets.borrow().keys().copied().collect();
        sets.sort_unstable();
        sets
    }

    fn claim_set<E: Entity>(&self) -> DepotResult<()> {
        let type_id = TypeId::of::<E>();
        let mut sets = self.sets.borrow_mut();
        match sets.get(E::SET) {
            Some(existing) if *existing != type_id => Err(DepotError::InvalidInput(format!(
                "set `{}` is already registered by another entity type",
                E::SET
            ))),
            Some(_) => Ok(()),
            None => {
                sets.insert(E::SET, type_id);
                Ok(())
            }
        }
    }
}
