/// Conversion between entities and JSON objects
use anyhow::{bail, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dstore_core::{Entity, Key, Property, Value, KEY_PROPERTY};

/// Render an entity as a JSON object. The key is stored under `__key__`;
/// single values become scalars and multi-valued properties become arrays.
pub fn entity_to_json(entity: &Entity) -> serde_json::Value {
    let mut obj = properties_to_json(entity);
    obj.insert(KEY_PROPERTY.to_string(), serde_json::Value::String(entity.key().to_string()));
    serde_json::Value::Object(obj)
}

fn properties_to_json(entity: &Entity) -> serde_json::Map<String, serde_json::Value> {
    let mut obj = serde_json::Map::new();
    for property in entity.properties() {
        let json = if property.is_multi() {
            serde_json::Value::Array(property.values().iter().map(value_to_json).collect())
        } else {
            property.value().map(value_to_json).unwrap_or(serde_json::Value::Null)
        };
        obj.insert(property.name().to_string(), json);
    }
    obj
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) | Value::BlobKey(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) | Value::Timestamp(i) => serde_json::Value::Number((*i).into()),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Blob(bytes) => serde_json::Value::String(STANDARD.encode(bytes)),
        Value::Key(key) => serde_json::Value::String(key.to_string()),
        Value::Entity(entity) => serde_json::Value::Object(properties_to_json(entity)),
    }
}

/// Build an entity from a JSON object of scalars or arrays of scalars.
/// Properties named in `indexed` are indexed.
pub fn json_to_entity(key: Key, json: &serde_json::Value, indexed: &[&str]) -> Result<Entity> {
    let Some(obj) = json.as_object() else {
        bail!("Properties must be a JSON object");
    };

    let mut entity = Entity::new(key);
    for (name, value) in obj {
        let property = match value {
            serde_json::Value::Array(items) => {
                let values = items.iter().map(json_scalar).collect::<Result<Vec<_>>>()?;
                Property::multi(name.clone(), values)?
            }
            scalar => Property::new(name.clone(), json_scalar(scalar)?),
        };
        entity.set(property.with_indexed(indexed.contains(&name.as_str())));
    }
    Ok(entity)
}

fn json_scalar(value: &serde_json::Value) -> Result<Value> {
    Ok(match value {
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        other => bail!("Unsupported property value: {}", other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstore_core::PathBuilder;
    use serde_json::json;

    fn key() -> Key {
        PathBuilder::new().name("User", "alice").build().unwrap()
    }

    #[test]
    fn test_json_to_entity() {
        let json = json!({"name": "Alice", "age": 30, "score": 1.5, "admin": false, "tags": ["a", "b"]});
        let entity = json_to_entity(key(), &json, &["name"]).unwrap();

        assert_eq!(entity.get("age"), Some(&Value::Integer(30)));
        assert_eq!(entity.get("score"), Some(&Value::Double(1.5)));
        assert!(entity.property("name").unwrap().is_indexed());
        assert!(!entity.property("age").unwrap().is_indexed());
        assert!(entity.property("tags").unwrap().is_multi());
    }

    #[test]
    fn test_rejects_nested_and_mixed() {
        assert!(json_to_entity(key(), &json!({"x": {"y": 1}}), &[]).is_err());
        assert!(json_to_entity(key(), &json!({"x": [1, "a"]}), &[]).is_err());
        assert!(json_to_entity(key(), &json!([1, 2]), &[]).is_err());
    }

    #[test]
    fn test_entity_to_json() {
        let entity = json_to_entity(key(), &json!({"name": "Alice", "tags": ["a"]}), &[]).unwrap();
        let json = entity_to_json(&entity);

        assert_eq!(json["__key__"], "User:alice");
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["tags"], json!(["a"]));
    }
}
