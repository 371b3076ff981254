//! Ordering stage.

use super::Query;
use crate::error::{DepotError, DepotResult};
use crate::model::entity::{property_names, Entity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

/// One sort key of a view; earlier keys take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOrdering {
    pub property: String,
    pub direction: OrderDirection,
}

impl ViewOrdering {
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: OrderDirection::Ascending,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: OrderDirection::Descending,
        }
    }
}

impl<E: Entity> Query<E> {
    /// Sorts by `orderings[0]`, breaking ties with the following entries.
    ///
    /// # Errors
    /// - `PropertyNotFound` when an ordering names a property `E` does not
    ///   serialize, even if the sequence is empty.
    pub fn order_view(self, orderings: &[ViewOrdering]) -> DepotResult<Self> {
        if orderings.is_empty() {
            return Ok(self);
        }

        let known = property_names::<E>();
        if let Some(missing) = orderings
            .iter()
            .find(|ordering| !known.contains(&ordering.property))
        {
            return Err(DepotError::PropertyNotFound {
                set: E::SET,
                property: missing.property.clone(),
            });
        }

        let mut keyed = Vec::with_capacity(self.len());
        for entity in self {
            let document = serde_json::to_value(&entity).map_err(|err| {
                DepotError::InvalidData(format!("cannot encode {} for ordering: {err}", E::SET))
            })?;
            let keys: Vec<Value> = orderings
                .iter()
                .map(|ordering| {
                    document
                        .get(&ordering.property)
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect();
            keyed.push((keys, entity));
        }

        keyed.sort_by(|(left, _), (right, _)| compare_keys(left, right, orderings));
        Ok(keyed.into_iter().map(|(_, entity)| entity).collect())
    }
}

fn compare_keys(left: &[Value], right: &[Value], orderings: &[ViewOrdering]) -> Ordering {
    left.iter()
        .zip(right)
        .zip(orderings)
        .map(|((left, right), ordering)| {
            let ordered = compare_values(left, right);
            match ordering.direction {
                OrderDirection::Ascending => ordered,
                OrderDirection::Descending => ordered.reverse(),
            }
        })
        .find(|ordered| ordered.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Total order over JSON values: null < bool < number < string < array <
/// object; values of one kind compare naturally.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        (Value::Number(left), Value::Number(right)) => match (left.as_i64(), right.as_i64()) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => left
                .as_f64()
                .unwrap_or_default()
                .total_cmp(&right.as_f64().unwrap_or_default()),
        },
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Array(left), Value::Array(right)) => left
            .iter()
            .zip(right)
            .map(|(left, right)| compare_values(left, right))
            .find(|ordered| ordered.is_ne())
            .unwrap_or_else(|| left.len().cmp(&right.len())),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::compare_values;
    use serde_json::json;
    use std::cmp::Ordering;

    #[test]
    fn values_of_different_kinds_rank_by_kind() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &json!("0")), Ordering::Less);
        assert_eq!(compare_values(&json!({}), &json!([])), Ordering::Greater);
    }

    #[test]
    fn numbers_compare_across_integer_and_float() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!(-3), &json!(-3)), Ordering::Equal);
    }

    #[test]
    fn arrays_compare_elementwise_then_by_length() {
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1])), Ordering::Greater);
    }
}
