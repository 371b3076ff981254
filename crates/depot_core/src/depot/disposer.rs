//! Cleanup hook for entities created or updated through a depot.

use crate::error::DepotResult;
use crate::model::entity::EntityId;
use crate::session::Session;
use log::info;

/// Receives `(set, id)` of every entity a depot creates or updates.
pub trait Disposer {
    fn push(&mut self, set: &'static str, id: EntityId);
}

/// Records touched rows and deletes them on [`RecordDisposer::dispose`].
#[derive(Debug, Default)]
pub struct RecordDisposer {
    records: Vec<(&'static str, EntityId)>,
}

impl RecordDisposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[(&'static str, EntityId)] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Deletes recorded rows, newest first, and returns how many existed.
    pub fn dispose(&mut self, session: &mut Session) -> DepotResult<usize> {
        let recorded = self.records.len();
        let mut removed = 0;
        while let Some((set, id)) = self.records.pop() {
            if session.remove_record(set, id)? {
                removed += 1;
            }
        }
        info!("event=dispose module=depot status=ok recorded={recorded} removed={removed}");
        Ok(removed)
    }
}

impl Disposer for RecordDisposer {
    fn push(&mut self, set: &'static str, id: EntityId) {
        self.records.push((set, id));
    }
}
