//! Relation descriptors.
//!
//! # Responsibility
//! - Declare which fields of an entity reference other entities.
//! - Dispatch reconciler, hydration and commit work to the typed target.
//!
//! # Invariants
//! - Descriptors are built once per entity type and cached by the session.
//! - A non-empty value whose shape differs from the declared kind is an
//!   integrity violation.

use crate::error::{DepotError, DepotResult};
use crate::model::entity::Entity;
use crate::reconcile;
use crate::session::{CommitContext, Linker, Loader, Session};
use log::warn;

/// Cardinality of a relation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Single,
    Collection,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Collection => "collection",
        }
    }
}

/// Mutable view over one relation field of an entity.
pub enum RelationSlot<'a, T> {
    Single(&'a mut Option<T>),
    Collection(&'a mut Vec<T>),
}

impl<T> RelationSlot<'_, T> {
    pub fn kind(&self) -> RelationKind {
        match self {
            Self::Single(_) => RelationKind::Single,
            Self::Collection(_) => RelationKind::Collection,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.is_none(),
            Self::Collection(items) => items.is_empty(),
        }
    }
}

/// Field accessor of a relation.
pub type SlotAccessor<E, T> = for<'a> fn(&'a mut E) -> RelationSlot<'a, T>;

/// Type-erased relation descriptor owned by entity type `E`.
pub struct Relation<E> {
    ops: Box<dyn RelationOps<E>>,
}

impl<E: Entity> Relation<E> {
    /// Declares a single-valued relation (`Option<T>` field).
    pub fn single<T: Entity>(name: &'static str, access: SlotAccessor<E, T>) -> Self {
        Self::declare(name, RelationKind::Single, access)
    }

    /// Declares a collection relation (`Vec<T>` field).
    pub fn collection<T: Entity>(name: &'static str, access: SlotAccessor<E, T>) -> Self {
        Self::declare(name, RelationKind::Collection, access)
    }

    pub fn declare<T: Entity>(
        name: &'static str,
        kind: RelationKind,
        access: SlotAccessor<E, T>,
    ) -> Self {
        Self {
            ops: Box::new(TypedRelation { name, kind, access }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.ops.name()
    }

    pub fn kind(&self) -> RelationKind {
        self.ops.kind()
    }

    /// Set name of the related entity type.
    pub fn target(&self) -> &'static str {
        self.ops.target()
    }

    pub(crate) fn resolve(&self, entity: &mut E, session: &mut Session) -> DepotResult<()> {
        self.ops.resolve(entity, session)
    }

    pub(crate) fn swap(&self, left: &mut E, right: &mut E) -> DepotResult<()> {
        self.ops.swap(left, right)
    }

    pub(crate) fn reconcile(
        &self,
        original: &mut E,
        incoming: &mut E,
        session: &mut Session,
    ) -> DepotResult<()> {
        self.ops.reconcile(original, incoming, session)
    }

    pub(crate) fn cascade(&self, entity: &mut E, ctx: &mut CommitContext<'_>) -> DepotResult<()> {
        self.ops.cascade(entity, ctx)
    }

    pub(crate) fn hydrate(&self, entity: &mut E, loader: &mut Loader<'_>) -> DepotResult<()> {
        self.ops.hydrate(entity, loader)
    }

    pub(crate) fn relink(&self, entity: &mut E, linker: &mut Linker<'_>) -> DepotResult<()> {
        self.ops.relink(entity, linker)
    }
}

trait RelationOps<E> {
    fn name(&self) -> &'static str;
    fn kind(&self) -> RelationKind;
    fn target(&self) -> &'static str;
    fn resolve(&self, entity: &mut E, session: &mut Session) -> DepotResult<()>;
    fn swap(&self, left: &mut E, right: &mut E) -> DepotResult<()>;
    fn reconcile(&self, original: &mut E, incoming: &mut E, session: &mut Session)
        -> DepotResult<()>;
    fn cascade(&self, entity: &mut E, ctx: &mut CommitContext<'_>) -> DepotResult<()>;
    fn hydrate(&self, entity: &mut E, loader: &mut Loader<'_>) -> DepotResult<()>;
    fn relink(&self, entity: &mut E, linker: &mut Linker<'_>) -> DepotResult<()>;
}

struct TypedRelation<E, T> {
    name: &'static str,
    kind: RelationKind,
    access: SlotAccessor<E, T>,
}

impl<E: Entity, T: Entity> TypedRelation<E, T> {
    fn slot<'a>(&self, entity: &'a mut E) -> DepotResult<RelationSlot<'a, T>> {
        let slot = (self.access)(entity);
        if slot.kind() != self.kind && !slot.is_empty() {
            return Err(DepotError::integrity(
                E::SET,
                self.name,
                format!(
                    "declared as {} relation but holds a {} value",
                    self.kind.as_str(),
                    slot.kind().as_str()
                ),
            ));
        }
        Ok(slot)
    }

    fn shape_mismatch(&self) -> DepotError {
        DepotError::integrity(
            E::SET,
            self.name,
            "relation shape differs between original and replacement",
        )
    }
}

impl<E: Entity, T: Entity> RelationOps<E> for TypedRelation<E, T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> RelationKind {
        self.kind
    }

    fn target(&self) -> &'static str {
        T::SET
    }

    fn resolve(&self, entity: &mut E, session: &mut Session) -> DepotResult<()> {
        match self.slot(entity)? {
            RelationSlot::Single(value) => {
                if let Some(reference) = value.as_ref() {
                    let resolved =
                        reconcile::resolve_reference(session, E::SET, self.name, reference)?;
                    *value = Some(resolved);
                }
            }
            RelationSlot::Collection(items) => {
                if items.is_empty() {
                    return Ok(());
                }
                let mut resolved = Vec::with_capacity(items.len());
                for reference in items.iter() {
                    resolved.push(reconcile::resolve_reference(
                        session, E::SET, self.name, reference,
                    )?);
                }
                *items = resolved;
            }
        }
        Ok(())
    }

    fn swap(&self, left: &mut E, right: &mut E) -> DepotResult<()> {
        match (self.slot(left)?, self.slot(right)?) {
            (RelationSlot::Single(left), RelationSlot::Single(right)) => {
                std::mem::swap(left, right);
            }
            (RelationSlot::Collection(left), RelationSlot::Collection(right)) => {
                std::mem::swap(left, right);
            }
            _ => return Err(self.shape_mismatch()),
        }
        Ok(())
    }

    fn reconcile(
        &self,
        original: &mut E,
        incoming: &mut E,
        session: &mut Session,
    ) -> DepotResult<()> {
        match (self.slot(original)?, self.slot(incoming)?) {
            (RelationSlot::Collection(current), RelationSlot::Collection(next)) => {
                reconcile::merge_collection(session, current, std::mem::take(next))
            }
            (RelationSlot::Single(current), RelationSlot::Single(next)) => {
                reconcile::merge_single(session, E::SET, self.name, current, next.take())
            }
            _ => Err(self.shape_mismatch()),
        }
    }

    fn cascade(&self, entity: &mut E, ctx: &mut CommitContext<'_>) -> DepotResult<()> {
        match self.slot(entity)? {
            RelationSlot::Single(value) => {
                if let Some(child) = value.as_mut().filter(|child| !child.is_persisted()) {
                    ctx.insert_child(child)?;
                }
            }
            RelationSlot::Collection(items) => {
                for child in items.iter_mut().filter(|child| !child.is_persisted()) {
                    ctx.insert_child(child)?;
                }
            }
        }
        Ok(())
    }

    fn hydrate(&self, entity: &mut E, loader: &mut Loader<'_>) -> DepotResult<()> {
        match self.slot(entity)? {
            RelationSlot::Single(value) => {
                let Some(id) = value
                    .as_ref()
                    .filter(|related| related.is_persisted())
                    .map(|related| related.id())
                else {
                    return Ok(());
                };
                *value = loader.load::<T>(id)?;
                if value.is_none() {
                    warn!(
                        "event=relation_dangling module=model status=skip set={} relation={} target={} id={}",
                        E::SET,
                        self.name,
                        T::SET,
                        id
                    );
                }
            }
            RelationSlot::Collection(items) => {
                let mut hydrated = Vec::with_capacity(items.len());
                for item in items.drain(..) {
                    if !item.is_persisted() {
                        hydrated.push(item);
                        continue;
                    }
                    let id = item.id();
                    match loader.load::<T>(id)? {
                        Some(found) => hydrated.push(found),
                        None => warn!(
                            "event=relation_dangling module=model status=skip set={} relation={} target={} id={}",
                            E::SET,
                            self.name,
                            T::SET,
                            id
                        ),
                    }
                }
                *items = hydrated;
            }
        }
        Ok(())
    }

    fn relink(&self, entity: &mut E, linker: &mut Linker<'_>) -> DepotResult<()> {
        match self.slot(entity)? {
            RelationSlot::Single(value) => {
                if let Some(item) = value.as_mut() {
                    relink_item(item, linker)?;
                }
            }
            RelationSlot::Collection(items) => {
                for item in items.iter_mut() {
                    relink_item(item, linker)?;
                }
            }
        }
        Ok(())
    }
}

fn relink_item<T: Entity>(item: &mut T, linker: &mut Linker<'_>) -> DepotResult<()> {
    if !item.is_persisted() {
        return Ok(());
    }
    if let Some(current) = linker.current::<T>(item.id())? {
        *item = current;
    }
    Ok(())
}
