//! Query pipeline over materialized entity sequences.
//!
//! # Responsibility
//! - Filter, order and paginate sequences loaded from a session.
//! - Run caller hooks around an operation's core query.
//!
//! # Invariants
//! - Stages never touch the store; they only reshape the sequence.
//! - Sequences loaded from a session start in ascending id order.

mod filter;
mod input;
mod ordering;
mod pagination;

pub use filter::{FilterNode, FilterOperator, Predicate, PropertyFilter, ViewFilterNode};
pub use input::{
    FilterQueryInput, FilteringBehavior, QueryHook, QueryInput, ViewInput, ViewOutput,
};
pub use ordering::{compare_values, OrderDirection, ViewOrdering};
pub use pagination::PaginationOutput;

use crate::model::entity::Entity;

/// Ordered sequence of entities flowing through pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<E> {
    items: Vec<E>,
}

impl<E> Default for Query<E> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<E> Query<E> {
    pub fn new(items: Vec<E>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&E> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&E> {
        self.items.last()
    }

    /// Keeps the items matching `predicate`, preserving order.
    pub fn filter(mut self, predicate: impl Fn(&E) -> bool) -> Self {
        self.items.retain(|item| predicate(item));
        self
    }

    pub fn into_vec(self) -> Vec<E> {
        self.items
    }
}

impl<E: Entity> Query<E> {
    /// Restores the default ascending id order.
    pub fn order_by_id(mut self) -> Self {
        self.items.sort_by_key(Entity::id);
        self
    }
}

impl<E> From<Vec<E>> for Query<E> {
    fn from(items: Vec<E>) -> Self {
        Self::new(items)
    }
}

impl<E> FromIterator<E> for Query<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<E> IntoIterator for Query<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a Query<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
