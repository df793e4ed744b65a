//! Conversions between the client data model and the wire messages
//!
//! Conversion functions are used instead of `From` impls so that every
//! fallible direction returns the crate's own error type.

use crate::entity::{Entity, Property, Value};
use crate::key::{Key, PathElement, PathId};
use crate::mutation::{Mutation, MutationOp};
use crate::query::{CompositeOperator, Direction, Filter, FilterOperator, Projection, QueryDescriptor};
use crate::{Error, Result, KEY_PROPERTY};
use dstore_proto::{self as proto, value::ValueType as ProtoValueType};

// ============================================================================
// Key Conversions
// ============================================================================

pub fn key_to_proto(key: &Key) -> proto::Key {
    proto::Key {
        partition_id: partition_id(key.namespace()),
        path_element: key
            .path()
            .iter()
            .map(|element| {
                let (id, name) = match &element.id {
                    Some(PathId::Id(id)) => (Some(*id), None),
                    Some(PathId::Name(name)) => (None, Some(name.clone())),
                    None => (None, None),
                };
                proto::key::PathElement {
                    kind: element.kind.clone(),
                    id,
                    name,
                }
            })
            .collect(),
    }
}

/// Convert a wire key. Only the final element may be incomplete; the
/// partition's dataset id is dropped so store-echoed keys compare equal to
/// locally built ones.
pub fn key_from_proto(key: proto::Key) -> Result<Key> {
    if key.path_element.is_empty() {
        return Err(Error::MalformedKey("key has an empty path".to_string()));
    }

    let last = key.path_element.len() - 1;
    let mut path = Vec::with_capacity(key.path_element.len());
    for (position, element) in key.path_element.into_iter().enumerate() {
        if element.kind.is_empty() {
            return Err(Error::MalformedKey(format!("element {} has an empty kind", position)));
        }
        let id = match (element.id, element.name) {
            (Some(_), Some(_)) => {
                return Err(Error::MalformedKey(format!(
                    "element {} ({}) has both id and name",
                    position, element.kind
                )))
            }
            (Some(id), None) => Some(PathId::Id(id)),
            (None, Some(name)) => Some(PathId::Name(name)),
            (None, None) if position == last => None,
            (None, None) => {
                return Err(Error::MalformedKey(format!(
                    "ancestor element {} ({}) is incomplete",
                    position, element.kind
                )))
            }
        };
        path.push(PathElement {
            kind: element.kind,
            id,
        });
    }

    let namespace = key.partition_id.and_then(|p| p.namespace);
    Ok(Key::from_parts(namespace, path))
}

/// Partition for `namespace`, or `None` for the default namespace.
pub fn partition_id(namespace: Option<&str>) -> Option<proto::PartitionId> {
    namespace
        .filter(|ns| !ns.is_empty())
        .map(|ns| proto::PartitionId {
            dataset_id: None,
            namespace: Some(ns.to_string()),
        })
}

// ============================================================================
// Value Conversions
// ============================================================================

pub fn value_to_proto(value: &Value, indexed: bool) -> proto::Value {
    let value_type = match value {
        Value::String(s) => ProtoValueType::StringValue(s.clone()),
        Value::Integer(i) => ProtoValueType::IntegerValue(*i),
        Value::Boolean(b) => ProtoValueType::BooleanValue(*b),
        Value::Double(d) => ProtoValueType::DoubleValue(*d),
        Value::Timestamp(ts) => ProtoValueType::TimestampMicrosecondsValue(*ts),
        Value::Blob(b) => ProtoValueType::BlobValue(b.clone()),
        Value::BlobKey(k) => ProtoValueType::BlobKeyValue(k.clone()),
        Value::Entity(e) => ProtoValueType::EntityValue(entity_to_proto(e)),
        Value::Key(k) => ProtoValueType::KeyValue(key_to_proto(k)),
    };

    proto::Value {
        value_type: Some(value_type),
        meaning: None,
        indexed,
    }
}

pub fn value_from_proto(value: proto::Value) -> Result<Value> {
    let value_type = value
        .value_type
        .ok_or_else(|| Error::MalformedEntity("value has no type".to_string()))?;

    Ok(match value_type {
        ProtoValueType::StringValue(s) => Value::String(s),
        ProtoValueType::IntegerValue(i) => Value::Integer(i),
        ProtoValueType::BooleanValue(b) => Value::Boolean(b),
        ProtoValueType::DoubleValue(d) => Value::Double(d),
        ProtoValueType::TimestampMicrosecondsValue(ts) => Value::Timestamp(ts),
        ProtoValueType::BlobValue(b) => Value::Blob(b),
        ProtoValueType::BlobKeyValue(k) => Value::BlobKey(k),
        ProtoValueType::EntityValue(e) => Value::entity(entity_from_proto(e)?),
        ProtoValueType::KeyValue(k) => Value::Key(key_from_proto(k)?),
    })
}

// ============================================================================
// Entity Conversions
// ============================================================================

pub fn property_to_proto(property: &Property) -> proto::Property {
    proto::Property {
        name: property.name().to_string(),
        multi: property.is_multi(),
        value: property
            .values()
            .iter()
            .map(|v| value_to_proto(v, property.is_indexed()))
            .collect(),
    }
}

/// A property counts as indexed when all of its values are.
pub fn property_from_proto(property: proto::Property) -> Result<Property> {
    let indexed = !property.value.is_empty() && property.value.iter().all(|v| v.indexed);
    let values = property
        .value
        .into_iter()
        .map(value_from_proto)
        .collect::<Result<Vec<_>>>()?;
    Property::from_parts(property.name, values, indexed, property.multi)
}

pub fn entity_to_proto(entity: &Entity) -> proto::Entity {
    proto::Entity {
        key: Some(key_to_proto(entity.key())),
        property: entity.properties().map(property_to_proto).collect(),
    }
}

pub fn entity_from_proto(entity: proto::Entity) -> Result<Entity> {
    let key = entity
        .key
        .ok_or_else(|| Error::MalformedEntity("entity has no key".to_string()))?;
    let mut result = Entity::new(key_from_proto(key)?);

    for property in entity.property {
        let property = property_from_proto(property)?;
        if result.property(property.name()).is_some() {
            return Err(Error::MalformedEntity(format!(
                "duplicate property '{}'",
                property.name()
            )));
        }
        result.set(property);
    }
    Ok(result)
}

// ============================================================================
// Mutation Conversions
// ============================================================================

pub fn mutation_to_proto(mutation: Mutation) -> proto::Mutation {
    use proto::mutation_operation::Operation;

    let operation = mutation
        .into_ops()
        .into_iter()
        .map(|op| {
            let operation = match op {
                MutationOp::Upsert(entity) => Operation::Upsert(entity_to_proto(&entity)),
                MutationOp::InsertAutoId(entity) => Operation::InsertAutoId(entity_to_proto(&entity)),
                MutationOp::Delete(key) => Operation::Delete(key_to_proto(&key)),
            };
            proto::MutationOperation {
                operation: Some(operation),
            }
        })
        .collect();

    proto::Mutation { operation }
}

// ============================================================================
// Query Conversions
// ============================================================================

fn property_ref(name: &str) -> proto::PropertyReference {
    proto::PropertyReference {
        name: name.to_string(),
    }
}

pub fn filter_to_proto(filter: &Filter) -> proto::Filter {
    match filter {
        Filter::Property {
            property,
            operator,
            value,
        } => {
            let op = match operator {
                FilterOperator::Equal => proto::property_filter::Operator::Equal,
                FilterOperator::HasAncestor => proto::property_filter::Operator::HasAncestor,
            };
            proto::Filter {
                composite_filter: None,
                property_filter: Some(proto::PropertyFilter {
                    property: Some(property_ref(property)),
                    operator: op as i32,
                    // filter values are matched against indexes
                    value: Some(value_to_proto(value, true)),
                }),
            }
        }
        Filter::Composite { operator, filters } => {
            let op = match operator {
                CompositeOperator::And => proto::composite_filter::Operator::And,
                CompositeOperator::Or => proto::composite_filter::Operator::Or,
            };
            proto::Filter {
                composite_filter: Some(proto::CompositeFilter {
                    operator: op as i32,
                    filter: filters.iter().map(filter_to_proto).collect(),
                }),
                property_filter: None,
            }
        }
    }
}

pub fn query_to_proto(query: &QueryDescriptor) -> proto::Query {
    let projection = match &query.projection {
        Projection::Full => Vec::new(),
        Projection::KeysOnly => vec![KEY_PROPERTY.to_string()],
        Projection::Properties(names) => names.clone(),
    };

    proto::Query {
        projection: projection
            .iter()
            .map(|name| proto::PropertyExpression {
                property: Some(property_ref(name)),
            })
            .collect(),
        kind: query
            .kinds
            .iter()
            .map(|kind| proto::KindExpression { name: kind.clone() })
            .collect(),
        filter: query.filter.as_ref().map(filter_to_proto),
        order: query
            .orders
            .iter()
            .map(|order| {
                let direction = match order.direction {
                    Direction::Ascending => proto::property_order::Direction::Ascending,
                    Direction::Descending => proto::property_order::Direction::Descending,
                };
                proto::PropertyOrder {
                    property: Some(property_ref(&order.property)),
                    direction: direction as i32,
                }
            })
            .collect(),
        group_by: query.group_by.iter().map(|name| property_ref(name)).collect(),
        start_cursor: None,
        offset: query.offset as i32,
        limit: query.limit.map(|l| l as i32),
    }
}
