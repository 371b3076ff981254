//! Unit-of-work session over the record store.
//!
//! # Responsibility
//! - Own the store connection, the identity map and the relation registry.
//! - Stage additions, modifications and deletions and write them atomically.
//!
//! # Invariants
//! - `save_changes` either writes every pending entry or none of them, and
//!   leaves the tracker exactly as it was when it fails.
//! - Tracked reads return the identity-map value when one exists.
//! - After a commit, related values held by tracked entries match the
//!   tracked state of those related entities.
//! - A session is single-threaded; callers serialize access.

mod commit;
mod linker;
mod loader;
mod schema;
mod tracker;

pub(crate) use commit::CommitContext;
pub(crate) use linker::Linker;
pub(crate) use loader::Loader;
pub use tracker::EntryState;

use crate::db::migrations::{current_version, ensure_current};
use crate::db::records::{count_set, delete_record};
use crate::db::{open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};
use crate::error::{DepotError, DepotResult};
use crate::logging::{sanitize_message, MAX_LOGGED_ERROR_CHARS};
use crate::model::entity::{Entity, EntityId};
use crate::model::relation::Relation;
use crate::query::Query;
use log::{error, info, warn};
use rusqlite::Connection;
use schema::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracker::Tracker;

/// Where the session's store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

/// Store configuration of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub location: StoreLocation,
    pub busy_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::memory()
    }
}

impl SessionOptions {
    pub fn memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Handle to an entry added in the current session, valid after commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHandle(usize);

/// Store connection plus identity map.
pub struct Session {
    conn: Connection,
    tracker: Tracker,
    schema: Schema,
}

impl Session {
    /// Opens the configured store and applies pending migrations.
    pub fn open(options: SessionOptions) -> DepotResult<Self> {
        let conn = match &options.location {
            StoreLocation::Memory => open_db_in_memory(options.busy_timeout)?,
            StoreLocation::File(path) => open_db(path, options.busy_timeout)?,
        };
        Ok(Self::with_connection(conn))
    }

    pub fn open_in_memory() -> DepotResult<Self> {
        Self::open(SessionOptions::memory())
    }

    /// Wraps an existing connection that must already be fully migrated.
    pub fn from_connection(conn: Connection) -> DepotResult<Self> {
        ensure_current(&conn)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            tracker: Tracker::default(),
            schema: Schema::default(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn can_connect(&self) -> bool {
        self.conn
            .query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    /// Checks that the store is reachable and fully migrated.
    ///
    /// With `strict` set, failures are returned as errors instead of `false`.
    pub fn validate(&self, strict: bool) -> DepotResult<bool> {
        if !self.can_connect() {
            if strict {
                return Err(DepotError::InvalidData(
                    "store connection is not usable".to_string(),
                ));
            }
            return Ok(false);
        }
        match ensure_current(&self.conn) {
            Ok(()) => Ok(true),
            Err(err) if strict => Err(err.into()),
            Err(err) => {
                warn!(
                    "event=session_validate module=session status=error error_code=store_not_current error={err}"
                );
                Ok(false)
            }
        }
    }

    pub fn schema_version(&self) -> DepotResult<u32> {
        Ok(current_version(&self.conn)?)
    }

    /// Registers `E` and returns how many relations it declares.
    pub fn register<E: Entity>(&self) -> DepotResult<usize> {
        Ok(self.schema.relations::<E>()?.len())
    }

    pub fn registered_sets(&self) -> Vec<&'static str> {
        self.schema.registered_sets()
    }

    pub(crate) fn relations<E: Entity>(&self) -> DepotResult<Rc<Vec<Relation<E>>>> {
        self.schema.relations::<E>()
    }

    /// Tracked lookup by id.
    pub fn find<E: Entity>(&mut self, id: EntityId) -> DepotResult<Option<E>> {
        Loader::tracking(&self.conn, &self.schema, &mut self.tracker).load::<E>(id)
    }

    /// Lookup by id that neither consults nor fills the identity map.
    pub fn find_untracked<E: Entity>(&self, id: EntityId) -> DepotResult<Option<E>> {
        Loader::detached(&self.conn, &self.schema).load::<E>(id)
    }

    /// Tracked source sequence of every `E` in ascending id order.
    pub fn query<E: Entity>(&mut self) -> DepotResult<Query<E>> {
        let entities =
            Loader::tracking(&self.conn, &self.schema, &mut self.tracker).load_set::<E>()?;
        Ok(Query::new(entities))
    }

    pub fn query_untracked<E: Entity>(&self) -> DepotResult<Query<E>> {
        let entities = Loader::detached(&self.conn, &self.schema).load_set::<E>()?;
        Ok(Query::new(entities))
    }

    pub fn count<E: Entity>(&self) -> DepotResult<usize> {
        Ok(count_set(&self.conn, E::SET)?)
    }

    pub fn state<E: Entity>(&self, id: EntityId) -> EntryState {
        self.tracker.state(E::SET, id)
    }

    /// Forces the tracking state of an already tracked entity.
    ///
    /// `Detached` stops tracking it.
    pub fn set_state<E: Entity>(&mut self, id: EntityId, state: EntryState) -> DepotResult<()> {
        if state == EntryState::Detached {
            self.tracker.forget(E::SET, id);
            return Ok(());
        }
        if !self.tracker.set_state(E::SET, id, state) {
            return Err(DepotError::not_found(E::SET, format!("tracked id = {id}")));
        }
        Ok(())
    }

    /// Starts tracking a persisted entity as `Unchanged`.
    ///
    /// Returns the tracked value, which is the existing one when the entity
    /// was already tracked.
    pub fn attach<E: Entity>(&mut self, entity: E) -> DepotResult<E> {
        if !entity.is_persisted() {
            return Err(DepotError::InvalidInput(format!(
                "cannot attach unsaved {} entity",
                E::SET
            )));
        }
        if let Some((_, tracked)) = self.tracker.tracked::<E>(entity.id())? {
            return Ok(tracked);
        }
        let snapshot = encode(&entity)?;
        self.tracker
            .track(entity.clone(), EntryState::Unchanged, Some(snapshot));
        Ok(entity)
    }

    /// Stages an insertion. The id is assigned on commit.
    pub fn add<E: Entity>(&mut self, mut entity: E) -> DepotResult<EntryHandle> {
        entity.set_id(0);
        Ok(EntryHandle(self.tracker.track(entity, EntryState::Added, None)))
    }

    /// Stages a full replacement of a persisted entity.
    pub fn update<E: Entity>(&mut self, entity: E) -> DepotResult<EntryState> {
        if !entity.is_persisted() {
            return Err(DepotError::InvalidInput(format!(
                "cannot update unsaved {} entity",
                E::SET
            )));
        }
        Ok(self.tracker.mark_modified(entity))
    }

    /// Stores a new value for a tracked entity, marking it `Modified` only
    /// when it differs from what was loaded.
    pub fn stage<E: Entity>(&mut self, entity: E) -> DepotResult<EntryState> {
        self.tracker.stage(entity)
    }

    /// Stages a deletion.
    pub fn remove<E: Entity>(&mut self, entity: E) -> DepotResult<()> {
        if !entity.is_persisted() {
            return Err(DepotError::not_found(E::SET, format!("id = {}", entity.id())));
        }
        self.tracker.mark_deleted(entity);
        Ok(())
    }

    /// Deletes one row immediately, outside the unit of work.
    pub fn remove_record(&mut self, set: &'static str, id: EntityId) -> DepotResult<bool> {
        self.tracker.forget(set, id);
        Ok(delete_record(&self.conn, set, id)?)
    }

    /// Current value behind a handle returned by [`Session::add`].
    pub fn entry<E: Entity>(&self, handle: EntryHandle) -> DepotResult<Option<E>> {
        Ok(self.tracker.value::<E>(handle.0)?.cloned())
    }

    pub fn pending_changes(&self) -> usize {
        self.tracker.pending().len()
    }

    /// Writes every pending entry in one transaction.
    ///
    /// Returns the number of rows written, including related entities that
    /// were created implicitly.
    pub fn save_changes(&mut self) -> DepotResult<usize> {
        let pending = self.tracker.pending();
        if pending.is_empty() {
            return Ok(0);
        }

        let started_at = Instant::now();
        let backup = self.tracker.clone();
        match self.commit_pending(&pending) {
            Ok(written) => {
                self.tracker.relink(&self.schema)?;
                info!(
                    "event=session_commit module=session status=ok entries={} written={} duration_ms={}",
                    pending.len(),
                    written,
                    started_at.elapsed().as_millis()
                );
                Ok(written)
            }
            Err(err) => {
                self.tracker = backup;
                error!(
                    "event=session_commit module=session status=error entries={} duration_ms={} error_code={} error={}",
                    pending.len(),
                    started_at.elapsed().as_millis(),
                    err.code(),
                    sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                );
                Err(err)
            }
        }
    }

    /// Reverts every pending entry to its last persisted state.
    pub fn reject_changes(&mut self) -> usize {
        let rejected = self.tracker.reject();
        if rejected > 0 {
            info!("event=session_reject module=session status=ok entries={rejected}");
        }
        rejected
    }

    fn commit_pending(&mut self, pending: &[usize]) -> DepotResult<usize> {
        let tx = self.conn.transaction()?;
        let mut ctx = CommitContext::new(&tx, &mut self.tracker, &self.schema);
        let mut written = 0;

        for &slot in pending {
            let Some(mut entry) = ctx.take_entry(slot) else {
                continue;
            };
            entry.value.commit(entry.state, &mut ctx)?;
            ctx.settle_entry(slot, entry)?;
            written += 1;
        }

        written += ctx.inserted_children();
        drop(ctx);
        tx.commit()?;
        Ok(written)
    }
}

pub(crate) fn encode<E: Serialize + ?Sized>(entity: &E) -> DepotResult<String> {
    serde_json::to_string(entity)
        .map_err(|err| DepotError::InvalidData(format!("cannot encode entity: {err}")))
}

pub(crate) fn decode<E: DeserializeOwned>(payload: &str) -> DepotResult<E> {
    serde_json::from_str(payload)
        .map_err(|err| DepotError::InvalidData(format!("cannot decode entity: {err}")))
}
