//! Materializes entities and their relation graphs from stored rows.
//!
//! # Invariants
//! - In tracking mode, a row already present in the identity map is never
//!   decoded again; the tracked value wins.
//! - Cycles are cut at the first revisit: the inner occurrence keeps only
//!   its stored shape.

use super::schema::Schema;
use super::tracker::{EntryState, Tracker};
use super::decode;
use crate::db::records::{select_record, select_set, RecordRow};
use crate::error::DepotResult;
use crate::model::entity::{Entity, EntityId};
use rusqlite::Connection;
use std::collections::HashSet;

pub(crate) struct Loader<'a> {
    conn: &'a Connection,
    schema: &'a Schema,
    tracker: Option<&'a mut Tracker>,
    visiting: HashSet<(&'static str, EntityId)>,
}

impl<'a> Loader<'a> {
    pub fn tracking(conn: &'a Connection, schema: &'a Schema, tracker: &'a mut Tracker) -> Self {
        Self {
            conn,
            schema,
            tracker: Some(tracker),
            visiting: HashSet::new(),
        }
    }

    pub fn detached(conn: &'a Connection, schema: &'a Schema) -> Self {
        Self {
            conn,
            schema,
            tracker: None,
            visiting: HashSet::new(),
        }
    }

    pub fn load<T: Entity>(&mut self, id: EntityId) -> DepotResult<Option<T>> {
        if let Some(tracked) = self.tracked::<T>(id)? {
            return Ok(tracked);
        }
        match select_record(self.conn, T::SET, id)? {
            Some(row) => self.materialize(row).map(Some),
            None => Ok(None),
        }
    }

    /// Loads every entity of `T::SET` in ascending id order.
    pub fn load_set<T: Entity>(&mut self) -> DepotResult<Vec<T>> {
        let rows = select_set(self.conn, T::SET)?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            match self.tracked::<T>(row.id)? {
                Some(Some(tracked)) => entities.push(tracked),
                Some(None) => {}
                None => entities.push(self.materialize(row)?),
            }
        }
        Ok(entities)
    }

    /// `Some(None)` marks an entry that is tracked as deleted.
    fn tracked<T: Entity>(&self, id: EntityId) -> DepotResult<Option<Option<T>>> {
        let Some(tracker) = self.tracker.as_deref() else {
            return Ok(None);
        };
        Ok(tracker
            .tracked::<T>(id)?
            .map(|(state, value)| (state != EntryState::Deleted).then_some(value)))
    }

    fn materialize<T: Entity>(&mut self, row: RecordRow) -> DepotResult<T> {
        let mut value: T = decode(&row.payload)?;
        value.set_id(row.id);
        value.set_timestamp(row.timestamp);

        let key = (T::SET, row.id);
        if !self.visiting.insert(key) {
            return Ok(value);
        }

        let slot = self
            .tracker
            .as_deref_mut()
            .map(|tracker| tracker.track(value.clone(), EntryState::Unchanged, Some(row.payload)));

        let schema = self.schema;
        let relations = schema.relations::<T>()?;
        let mut hydrated = Ok(());
        for relation in relations.iter() {
            hydrated = relation.hydrate(&mut value, self);
            if hydrated.is_err() {
                break;
            }
        }
        self.visiting.remove(&key);
        hydrated?;

        if let (Some(slot), Some(tracker)) = (slot, self.tracker.as_deref_mut()) {
            tracker.refresh(slot, value.clone())?;
        }
        Ok(value)
    }
}
