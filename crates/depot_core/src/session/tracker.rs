//! Identity map and change tracker.
//!
//! # Invariants
//! - At most one tracked entry exists per `(set, id)` of a persisted entity.
//! - `snapshot` is the payload last loaded from or written to the store.
//! - Entries in `Added` state are not indexed until they receive an id.

use super::commit::CommitContext;
use super::linker::Linker;
use super::schema::Schema;
use super::{decode, encode};
use crate::error::{DepotError, DepotResult};
use crate::model::entity::{Entity, EntityId};
use std::any::Any;
use std::collections::HashMap;

/// Tracking state of one entity inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Detached,
    Unchanged,
    Added,
    Modified,
    Deleted,
}

impl EntryState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::Unchanged => "unchanged",
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }

    /// True when the next `save_changes` writes this entry.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

/// Object-safe face of a tracked entity.
pub(crate) trait TrackedValue: Any {
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn TrackedValue>;
    fn entity_id(&self) -> EntityId;
    fn payload(&self) -> DepotResult<String>;
    fn restore(&mut self, snapshot: &str) -> DepotResult<()>;
    fn commit(&mut self, state: EntryState, ctx: &mut CommitContext<'_>) -> DepotResult<()>;
    fn relink(&mut self, linker: &mut Linker<'_>) -> DepotResult<()>;
}

impl<E: Entity> TrackedValue for E {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn TrackedValue> {
        Box::new(self.clone())
    }

    fn entity_id(&self) -> EntityId {
        self.id()
    }

    fn payload(&self) -> DepotResult<String> {
        encode(self)
    }

    fn restore(&mut self, snapshot: &str) -> DepotResult<()> {
        let mut restored: E = decode(snapshot)?;
        restored.set_id(self.id());
        *self = restored;
        Ok(())
    }

    fn commit(&mut self, state: EntryState, ctx: &mut CommitContext<'_>) -> DepotResult<()> {
        ctx.persist(self, state)
    }

    fn relink(&mut self, linker: &mut Linker<'_>) -> DepotResult<()> {
        linker.relink(self)
    }
}

pub(crate) struct Entry {
    pub set: &'static str,
    pub value: Box<dyn TrackedValue>,
    pub snapshot: Option<String>,
    pub state: EntryState,
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        Self {
            set: self.set,
            value: self.value.clone_boxed(),
            snapshot: self.snapshot.clone(),
            state: self.state,
        }
    }
}

enum Rejection {
    Keep,
    Drop,
    Restore(String),
}

#[derive(Default, Clone)]
pub(crate) struct Tracker {
    entries: Vec<Option<Entry>>,
    index: HashMap<(&'static str, EntityId), usize>,
}

impl Tracker {
    pub fn slot_of(&self, set: &'static str, id: EntityId) -> Option<usize> {
        self.index.get(&(set, id)).copied()
    }

    pub fn state(&self, set: &'static str, id: EntityId) -> EntryState {
        self.slot_of(set, id)
            .and_then(|slot| self.entries.get(slot)?.as_ref())
            .map_or(EntryState::Detached, |entry| entry.state)
    }

    pub fn value<T: Entity>(&self, slot: usize) -> DepotResult<Option<&T>> {
        let Some(entry) = self.entries.get(slot).and_then(Option::as_ref) else {
            return Ok(None);
        };
        entry
            .value
            .as_any()
            .downcast_ref::<T>()
            .map(Some)
            .ok_or_else(|| type_mismatch(entry.set, T::SET))
    }

    /// Clone of the tracked value for `(T::SET, id)` with its state.
    pub fn tracked<T: Entity>(&self, id: EntityId) -> DepotResult<Option<(EntryState, T)>> {
        let Some(slot) = self.slot_of(T::SET, id) else {
            return Ok(None);
        };
        let state = self.state(T::SET, id);
        Ok(self.value::<T>(slot)?.map(|value| (state, value.clone())))
    }

    pub fn track<T: Entity>(
        &mut self,
        value: T,
        state: EntryState,
        snapshot: Option<String>,
    ) -> usize {
        let slot = self.entries.len();
        if value.is_persisted() && state != EntryState::Added {
            self.index.insert((T::SET, value.id()), slot);
        }
        self.entries.push(Some(Entry {
            set: T::SET,
            value: Box::new(value),
            snapshot,
            state,
        }));
        slot
    }

    /// Replaces the value of a loaded entry and resets its snapshot.
    pub fn refresh<T: Entity>(&mut self, slot: usize, value: T) -> DepotResult<()> {
        let snapshot = encode(&value)?;
        if let Some(entry) = self.entries.get_mut(slot).and_then(Option::as_mut) {
            entry.value = Box::new(value);
            entry.snapshot = Some(snapshot);
        }
        Ok(())
    }

    /// Stores `value` and marks it `Modified` only when its payload differs
    /// from the snapshot.
    pub fn stage<T: Entity>(&mut self, value: T) -> DepotResult<EntryState> {
        let payload = encode(&value)?;
        let Some(entry) = self
            .slot_of(T::SET, value.id())
            .and_then(|slot| self.entries.get_mut(slot)?.as_mut())
        else {
            self.track(value, EntryState::Modified, None);
            return Ok(EntryState::Modified);
        };

        if entry.state == EntryState::Unchanged || entry.state == EntryState::Modified {
            entry.state = if entry.snapshot.as_deref() == Some(payload.as_str()) {
                EntryState::Unchanged
            } else {
                EntryState::Modified
            };
        }
        entry.value = Box::new(value);
        Ok(entry.state)
    }

    /// Marks `value` modified regardless of its payload.
    pub fn mark_modified<T: Entity>(&mut self, value: T) -> EntryState {
        match self
            .slot_of(T::SET, value.id())
            .and_then(|slot| self.entries.get_mut(slot)?.as_mut())
        {
            Some(entry) => {
                if entry.state != EntryState::Added {
                    entry.state = EntryState::Modified;
                }
                entry.value = Box::new(value);
                entry.state
            }
            None => {
                self.track(value, EntryState::Modified, None);
                EntryState::Modified
            }
        }
    }

    pub fn mark_deleted<T: Entity>(&mut self, value: T) {
        match self
            .slot_of(T::SET, value.id())
            .and_then(|slot| self.entries.get_mut(slot)?.as_mut())
        {
            Some(entry) => {
                entry.state = EntryState::Deleted;
                entry.value = Box::new(value);
            }
            None => {
                self.track(value, EntryState::Deleted, None);
            }
        }
    }

    pub fn set_state(&mut self, set: &'static str, id: EntityId, state: EntryState) -> bool {
        match self
            .slot_of(set, id)
            .and_then(|slot| self.entries.get_mut(slot)?.as_mut())
        {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    /// Stops tracking `(set, id)`. Returns whether an entry existed.
    pub fn forget(&mut self, set: &'static str, id: EntityId) -> bool {
        let Some(slot) = self.index.remove(&(set, id)) else {
            return false;
        };
        self.entries
            .get_mut(slot)
            .and_then(Option::take)
            .is_some()
    }

    pub fn pending(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches!(entry, Some(entry) if entry.state.is_pending()))
            .map(|(slot, _)| slot)
            .collect()
    }

    pub fn take(&mut self, slot: usize) -> Option<Entry> {
        self.entries.get_mut(slot).and_then(Option::take)
    }

    /// Puts a committed entry back as `Unchanged`, or drops it when it was
    /// deleted.
    pub fn settle(&mut self, slot: usize, mut entry: Entry) -> DepotResult<()> {
        let key = (entry.set, entry.value.entity_id());
        if entry.state == EntryState::Deleted {
            self.index.remove(&key);
            return Ok(());
        }
        entry.snapshot = Some(entry.value.payload()?);
        entry.state = EntryState::Unchanged;
        self.index.insert(key, slot);
        if let Some(target) = self.entries.get_mut(slot) {
            *target = Some(entry);
        }
        Ok(())
    }

    /// Points the related values of every entry at their tracked state and
    /// re-snapshots unchanged entries.
    pub fn relink(&mut self, schema: &Schema) -> DepotResult<()> {
        for slot in 0..self.entries.len() {
            let Some(mut entry) = self.take(slot) else {
                continue;
            };
            let relinked = entry
                .value
                .relink(&mut Linker::new(self, schema))
                .and_then(|()| {
                    if entry.state == EntryState::Unchanged {
                        entry.snapshot = Some(entry.value.payload()?);
                    }
                    Ok(())
                });
            self.entries[slot] = Some(entry);
            relinked?;
        }
        Ok(())
    }

    /// Reverts pending entries and returns how many were reverted.
    pub fn reject(&mut self) -> usize {
        let mut rejected = 0;
        for slot in 0..self.entries.len() {
            let rejection = match self.entries[slot].as_ref() {
                Some(entry) if entry.state == EntryState::Added => Rejection::Drop,
                Some(entry) if entry.state.is_pending() => match entry.snapshot.clone() {
                    Some(snapshot) => Rejection::Restore(snapshot),
                    None => Rejection::Drop,
                },
                _ => Rejection::Keep,
            };

            let dropped = match rejection {
                Rejection::Keep => continue,
                Rejection::Drop => true,
                Rejection::Restore(snapshot) => match self.entries[slot].as_mut() {
                    Some(entry) => {
                        let restored = entry.value.restore(&snapshot).is_ok();
                        entry.state = EntryState::Unchanged;
                        !restored
                    }
                    None => false,
                },
            };

            if dropped {
                if let Some(entry) = self.entries[slot].take() {
                    let key = (entry.set, entry.value.entity_id());
                    if self.index.get(&key) == Some(&slot) {
                        self.index.remove(&key);
                    }
                }
            }
            rejected += 1;
        }
        rejected
    }
}

fn type_mismatch(tracked: &'static str, requested: &'static str) -> DepotError {
    DepotError::InvalidData(format!(
        "tracked entry of set `{tracked}` cannot be read as `{requested}`"
    ))
}
