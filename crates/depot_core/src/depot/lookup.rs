//! Capability-specific depot operations.

use super::{Depot, UpdateInput, UpdateOutput};
use crate::error::{DepotError, DepotResult};
use crate::model::capability::{Activable, Named, Referenced};
use crate::model::entity::EntityId;
use crate::query::{FilterQueryInput, FilteringBehavior, QueryInput};

impl<E: Named> Depot<'_, E> {
    /// First entity whose name equals `name`.
    pub fn read_by_name(&mut self, name: &str) -> DepotResult<E> {
        let wanted = name.to_string();
        let output = self.read_filter(QueryInput::new(
            FilterQueryInput::new(move |entity: &E| entity.name() == wanted)
                .with_behavior(FilteringBehavior::First),
        ))?;
        output
            .into_parts()
            .0
            .into_iter()
            .next()
            .ok_or_else(|| DepotError::not_found(E::SET, format!("name = {name}")))
    }
}

impl<E: Referenced> Depot<'_, E> {
    /// First entity whose reference equals `reference`.
    pub fn read_by_reference(&mut self, reference: &str) -> DepotResult<E> {
        let wanted = reference.to_string();
        let output = self.read_filter(QueryInput::new(
            FilterQueryInput::new(move |entity: &E| entity.reference() == wanted)
                .with_behavior(FilteringBehavior::First),
        ))?;
        output
            .into_parts()
            .0
            .into_iter()
            .next()
            .ok_or_else(|| DepotError::not_found(E::SET, format!("reference = {reference}")))
    }
}

impl<E: Activable> Depot<'_, E> {
    /// Switches the entity on or off through a replace update.
    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> DepotResult<UpdateOutput<E>> {
        let mut entity = self.read(id)?;
        entity.set_enabled(enabled);
        self.update(UpdateInput::new(entity))
    }
}
