//! Writes pending tracker entries inside one store transaction.
//!
//! # Invariants
//! - Unsaved related entities are inserted before their owner so the owner
//!   payload carries their ids.
//! - A missing row on update or delete fails the whole commit.

use super::encode;
use super::schema::Schema;
use super::tracker::{Entry, EntryState, Tracker};
use crate::db::records::{delete_record, insert_record, write_payload};
use crate::error::{DepotError, DepotResult};
use crate::model::entity::{now_epoch_ms, Entity};
use rusqlite::Connection;

pub(crate) struct CommitContext<'a> {
    conn: &'a Connection,
    tracker: &'a mut Tracker,
    schema: &'a Schema,
    inserted_children: usize,
}

impl<'a> CommitContext<'a> {
    pub fn new(conn: &'a Connection, tracker: &'a mut Tracker, schema: &'a Schema) -> Self {
        Self {
            conn,
            tracker,
            schema,
            inserted_children: 0,
        }
    }

    pub fn take_entry(&mut self, slot: usize) -> Option<Entry> {
        self.tracker.take(slot)
    }

    pub fn settle_entry(&mut self, slot: usize, entry: Entry) -> DepotResult<()> {
        self.tracker.settle(slot, entry)
    }

    /// Related entities created implicitly during this commit.
    pub fn inserted_children(&self) -> usize {
        self.inserted_children
    }

    pub fn persist<T: Entity>(&mut self, value: &mut T, state: EntryState) -> DepotResult<()> {
        match state {
            EntryState::Added => self.insert(value),
            EntryState::Modified => {
                self.cascade(value)?;
                let payload = encode(&*value)?;
                if !write_payload(self.conn, T::SET, value.id(), value.timestamp(), &payload)? {
                    return Err(missing_row::<T>(value.id()));
                }
                Ok(())
            }
            EntryState::Deleted => {
                if !delete_record(self.conn, T::SET, value.id())? {
                    return Err(missing_row::<T>(value.id()));
                }
                Ok(())
            }
            EntryState::Detached | EntryState::Unchanged => Ok(()),
        }
    }

    /// Inserts an unsaved related entity and tracks it as `Unchanged`.
    pub fn insert_child<T: Entity>(&mut self, child: &mut T) -> DepotResult<()> {
        self.insert(child)?;
        let payload = encode(&*child)?;
        self.tracker
            .track(child.clone(), EntryState::Unchanged, Some(payload));
        self.inserted_children += 1;
        Ok(())
    }

    fn insert<T: Entity>(&mut self, value: &mut T) -> DepotResult<()> {
        self.cascade(value)?;
        if value.timestamp() <= 0 {
            value.set_timestamp(now_epoch_ms());
        }
        let id = insert_record(self.conn, T::SET, value.timestamp())?;
        value.set_id(id);
        let payload = encode(&*value)?;
        write_payload(self.conn, T::SET, id, value.timestamp(), &payload)?;
        Ok(())
    }

    fn cascade<T: Entity>(&mut self, value: &mut T) -> DepotResult<()> {
        let schema = self.schema;
        let relations = schema.relations::<T>()?;
        for relation in relations.iter() {
            relation.cascade(value, self)?;
        }
        Ok(())
    }
}

fn missing_row<T: Entity>(id: i64) -> DepotError {
    DepotError::not_found(T::SET, format!("id = {id}"))
}
