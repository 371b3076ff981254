//! Graph reconciler.
//!
//! # Responsibility
//! - Resolve relation references of an incoming entity to persisted,
//!   tracked instances before create or replace.
//! - Merge a replacement graph into a tracked original without losing
//!   identity or existing children.
//!
//! # Invariants
//! - Dependencies are never created through a replace or create: a
//!   reference with `id <= 0` is rejected.
//! - Merge never removes children that the replacement omits.
//! - Merge only touches nodes whose tracked state is `Unchanged`.

use crate::error::{DepotError, DepotResult};
use crate::model::entity::{Entity, EntityId};
use crate::session::{EntryState, Session};
use log::{debug, warn};
use std::collections::HashMap;

/// Replaces every relation value of `entity` with its persisted, tracked
/// counterpart.
///
/// # Errors
/// - `IntegrityViolation` for a reference that was never persisted or a
///   relation value of the wrong shape.
/// - `NotFound` for a reference whose row does not exist.
pub fn sanitize_entity<E: Entity>(session: &mut Session, entity: &mut E) -> DepotResult<()> {
    let relations = session.relations::<E>()?;
    for relation in relations.iter() {
        relation.resolve(entity, session)?;
    }
    Ok(())
}

/// Merges `replacement` into the tracked `original`.
///
/// Scalar values come from `replacement`; `original` keeps its id and
/// creation timestamp. Returns `false` when `original` was skipped because
/// it is not tracked as `Unchanged`.
pub fn sanitize_update_entity<E: Entity>(
    session: &mut Session,
    original: &mut E,
    replacement: E,
) -> DepotResult<bool> {
    let state = session.state::<E>(original.id());
    if state != EntryState::Unchanged {
        warn!(
            "event=reconcile_node module=reconcile status=skip set={} id={} state={}",
            E::SET,
            original.id(),
            state.as_str()
        );
        return Ok(false);
    }

    let relations = session.relations::<E>()?;

    // After the swaps `merged` holds replacement scalars with the original
    // relations and `replacement` holds the incoming relations.
    let mut merged = replacement;
    for relation in relations.iter() {
        relation.swap(original, &mut merged)?;
    }
    let mut incoming = std::mem::replace(original, merged);
    original.set_id(incoming.id());
    original.set_timestamp(incoming.timestamp());

    for relation in relations.iter() {
        relation.reconcile(original, &mut incoming, session)?;
    }

    let staged = session.stage(original.clone())?;
    debug!(
        "event=reconcile_node module=reconcile status=ok set={} id={} state={}",
        E::SET,
        original.id(),
        staged.as_str()
    );
    Ok(true)
}

pub(crate) fn resolve_reference<T: Entity>(
    session: &mut Session,
    owner: &'static str,
    relation: &'static str,
    reference: &T,
) -> DepotResult<T> {
    if !reference.is_persisted() {
        return Err(DepotError::integrity(
            owner,
            relation,
            "dependencies are not allowed to be implicitly created",
        ));
    }
    session
        .find::<T>(reference.id())?
        .ok_or_else(|| DepotError::not_found(T::SET, format!("id = {}", reference.id())))
}

/// Appends fresh items and recurses into items matched by id.
pub(crate) fn merge_collection<T: Entity>(
    session: &mut Session,
    current: &mut Vec<T>,
    incoming: Vec<T>,
) -> DepotResult<()> {
    let (fresh, existing): (Vec<T>, Vec<T>) =
        incoming.into_iter().partition(|item| !item.is_persisted());

    let mut replacements: HashMap<EntityId, T> = existing
        .into_iter()
        .map(|item| (item.id(), item))
        .collect();
    for item in current.iter_mut() {
        if let Some(replacement) = replacements.remove(&item.id()) {
            merge_tracked(session, item, replacement)?;
        }
    }

    current.extend(fresh);
    Ok(())
}

/// Attaches, recurses into or keeps a single related value.
pub(crate) fn merge_single<T: Entity>(
    session: &mut Session,
    owner: &'static str,
    relation: &'static str,
    current: &mut Option<T>,
    incoming: Option<T>,
) -> DepotResult<()> {
    let Some(incoming) = incoming else {
        return Ok(());
    };

    match current {
        Some(existing) if existing.is_persisted() && existing.id() == incoming.id() => {
            merge_tracked(session, existing, incoming)?;
        }
        Some(_) => {
            warn!(
                "event=reconcile_relation module=reconcile status=skip set={owner} relation={relation} incoming_id={}",
                incoming.id()
            );
        }
        None if !incoming.is_persisted() => *current = Some(incoming),
        None => {
            *current = Some(resolve_reference(session, owner, relation, &incoming)?);
        }
    }
    Ok(())
}

/// Merges `replacement` into the identity-map instance of `slot` and writes
/// the result back, so the owner and the map hold the same value.
fn merge_tracked<T: Entity>(
    session: &mut Session,
    slot: &mut T,
    replacement: T,
) -> DepotResult<()> {
    if let Some(tracked) = session.find::<T>(slot.id())? {
        *slot = tracked;
    }
    sanitize_update_entity(session, slot, replacement)?;
    Ok(())
}
