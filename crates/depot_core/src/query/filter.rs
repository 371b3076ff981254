//! Filter stage.

use super::ordering::compare_values;
use super::Query;
use crate::model::entity::{field_value, Entity};
use serde_json::Value;
use std::cmp::Ordering;
use std::rc::Rc;

/// Entity predicate produced by filter nodes and filtered reads.
pub type Predicate<E> = Box<dyn Fn(&E) -> bool>;

/// One AND-composed step of a view filter.
pub trait ViewFilterNode<E> {
    /// Application rank; lower runs first.
    fn order(&self) -> i32;

    fn compose(&self) -> Predicate<E>;
}

/// Closure-backed filter node.
pub struct FilterNode<E> {
    order: i32,
    predicate: Rc<dyn Fn(&E) -> bool>,
}

impl<E> FilterNode<E> {
    pub fn new(order: i32, predicate: impl Fn(&E) -> bool + 'static) -> Self {
        Self {
            order,
            predicate: Rc::new(predicate),
        }
    }
}

impl<E: 'static> ViewFilterNode<E> for FilterNode<E> {
    fn order(&self) -> i32 {
        self.order
    }

    fn compose(&self) -> Predicate<E> {
        let predicate = Rc::clone(&self.predicate);
        Box::new(move |entity: &E| predicate(entity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    /// Substring for strings, element membership for arrays.
    Contains,
    GreaterThan,
    LessThan,
}

impl FilterOperator {
    fn matches(self, field: &Value, expected: &Value) -> bool {
        match self {
            Self::Equals => field == expected,
            Self::NotEquals => field != expected,
            Self::Contains => match (field, expected) {
                (Value::String(haystack), Value::String(needle)) => {
                    haystack.contains(needle.as_str())
                }
                (Value::Array(items), _) => items.contains(expected),
                _ => false,
            },
            Self::GreaterThan => compare_values(field, expected) == Ordering::Greater,
            Self::LessThan => compare_values(field, expected) == Ordering::Less,
        }
    }
}

/// Filter node comparing one serialized property against a JSON value.
///
/// An entity without the property never matches.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub order: i32,
    pub property: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl PropertyFilter {
    pub fn new(
        order: i32,
        property: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            order,
            property: property.into(),
            operator,
            value: value.into(),
        }
    }
}

impl<E: Entity> ViewFilterNode<E> for PropertyFilter {
    fn order(&self) -> i32 {
        self.order
    }

    fn compose(&self) -> Predicate<E> {
        let property = self.property.clone();
        let operator = self.operator;
        let expected = self.value.clone();
        Box::new(move |entity: &E| {
            field_value(entity, &property)
                .is_some_and(|field| operator.matches(&field, &expected))
        })
    }
}

impl<E> Query<E> {
    /// Applies `filters` in ascending `order`, regardless of slice position.
    pub fn filter_view(self, filters: &[Box<dyn ViewFilterNode<E>>]) -> Self {
        if filters.is_empty() {
            return self;
        }

        let mut ordered: Vec<&dyn ViewFilterNode<E>> =
            filters.iter().map(|filter| &**filter).collect();
        ordered.sort_by_key(|filter| filter.order());

        ordered.into_iter().fold(self, |query, filter| {
            let predicate = filter.compose();
            query.filter(|entity| predicate(entity))
        })
    }
}
