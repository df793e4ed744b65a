use crate::{Error, Key, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

/// Typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    Double(f64),
    /// Microseconds since the Unix epoch
    Timestamp(i64),
    Blob(Bytes),
    BlobKey(String),
    Entity(Box<Entity>),
    Key(Key),
}

/// Type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Boolean,
    Double,
    Timestamp,
    Blob,
    BlobKey,
    Entity,
    Key,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Boolean => "boolean",
            ValueType::Double => "double",
            ValueType::Timestamp => "timestamp",
            ValueType::Blob => "blob",
            ValueType::BlobKey => "blob-key",
            ValueType::Entity => "entity",
            ValueType::Key => "key",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn blob(b: impl Into<Bytes>) -> Self {
        Value::Blob(b.into())
    }

    pub fn timestamp_micros(micros: i64) -> Self {
        Value::Timestamp(micros)
    }

    pub fn entity(entity: Entity) -> Self {
        Value::Entity(Box::new(entity))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Integer(_) => ValueType::Integer,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Double(_) => ValueType::Double,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Blob(_) => ValueType::Blob,
            Value::BlobKey(_) => ValueType::BlobKey,
            Value::Entity(_) => ValueType::Entity,
            Value::Key(_) => ValueType::Key,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::BlobKey(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_timestamp_micros(&self) -> Option<i64> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Bytes> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Value::Key(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        Value::Key(k)
    }
}

impl From<Entity> for Value {
    fn from(e: Entity) -> Self {
        Value::entity(e)
    }
}

/// Named property of an entity.
///
/// A single-valued property holds exactly one value. A `multi` property holds
/// zero or more values which all share one [`ValueType`].
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    values: Vec<Value>,
    indexed: bool,
    multi: bool,
}

impl Property {
    /// Single-valued, unindexed property.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
            indexed: false,
            multi: false,
        }
    }

    /// Single-valued, indexed property.
    pub fn indexed(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, value).with_indexed(true)
    }

    /// Multi-valued property. Fails if the values do not share one type.
    pub fn multi(name: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        check_uniform(&name, &values)?;
        Ok(Self {
            name,
            values,
            indexed: false,
            multi: true,
        })
    }

    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First value; the only one for single-valued properties.
    pub fn value(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Declared type, if the property holds any value.
    pub fn value_type(&self) -> Option<ValueType> {
        self.values.first().map(Value::value_type)
    }

    /// Rebuild a property from its wire parts, enforcing the value invariants.
    pub(crate) fn from_parts(name: String, values: Vec<Value>, indexed: bool, multi: bool) -> Result<Self> {
        if !multi && values.len() != 1 {
            return Err(Error::MalformedEntity(format!(
                "single-valued property '{}' has {} values",
                name,
                values.len()
            )));
        }
        check_uniform(&name, &values).map_err(|e| Error::MalformedEntity(e.to_string()))?;
        Ok(Self {
            name,
            values,
            indexed,
            multi,
        })
    }
}

fn check_uniform(name: &str, values: &[Value]) -> Result<()> {
    if let Some(first) = values.first() {
        let expected = first.value_type();
        if let Some(other) = values.iter().find(|v| v.value_type() != expected) {
            return Err(Error::InvalidProperty(format!(
                "property '{}' mixes {} and {} values",
                name,
                expected,
                other.value_type()
            )));
        }
    }
    Ok(())
}

/// A key plus a set of uniquely named properties
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    key: Key,
    properties: BTreeMap<String, Property>,
}

impl Entity {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    /// Build an entity whose properties are all strings. Properties named in
    /// `indexed` are indexed.
    pub fn from_strings<I, N, V>(key: Key, properties: I, indexed: &[&str]) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut entity = Entity::new(key);
        for (name, value) in properties {
            let name = name.into();
            let index = indexed.contains(&name.as_str());
            entity.set(Property::new(name, Value::String(value.into())).with_indexed(index));
        }
        entity
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Same properties under a different key (e.g. after id allocation).
    pub fn with_key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    /// Insert or replace the property with the same name.
    pub fn set(&mut self, property: Property) -> Option<Property> {
        self.properties.insert(property.name.clone(), property)
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.set(property);
        self
    }

    /// Set a single unindexed value.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.set(Property::new(name, value));
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// First value of the named property.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).and_then(Property::value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.properties.remove(name)
    }

    /// Properties in name order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathBuilder;

    fn user_key(name: &str) -> Key {
        PathBuilder::new().name("User", name).build().unwrap()
    }

    #[test]
    fn test_property_names_are_unique() {
        let mut entity = Entity::new(user_key("alice"));
        entity.set_value("age", 30i64);
        let previous = entity.set(Property::indexed("age", 31i64));

        assert_eq!(previous.unwrap().value(), Some(&Value::Integer(30)));
        assert_eq!(entity.len(), 1);
        assert_eq!(entity.get("age"), Some(&Value::Integer(31)));
        assert!(entity.property("age").unwrap().is_indexed());
    }

    #[test]
    fn test_multi_requires_uniform_type() {
        let ok = Property::multi("tags", vec!["a".into(), "b".into()]).unwrap();
        assert!(ok.is_multi());
        assert_eq!(ok.values().len(), 2);
        assert_eq!(ok.value_type(), Some(ValueType::String));

        let err = Property::multi("tags", vec!["a".into(), Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, Error::InvalidProperty(_)));
    }

    #[test]
    fn test_empty_multi_property() {
        let empty = Property::multi("tags", Vec::new()).unwrap();
        assert_eq!(empty.value(), None);
        assert_eq!(empty.value_type(), None);
    }

    #[test]
    fn test_single_valued_property_from_parts() {
        let err = Property::from_parts("x".into(), Vec::new(), false, false).unwrap_err();
        assert!(matches!(err, Error::MalformedEntity(_)));

        let err = Property::from_parts(
            "x".into(),
            vec![Value::Integer(1), Value::Boolean(true)],
            false,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedEntity(_)));
    }

    #[test]
    fn test_from_strings() {
        let entity = Entity::from_strings(
            user_key("bob"),
            vec![("email", "bob@example.com"), ("bio", "hello")],
            &["email"],
        );

        assert!(entity.property("email").unwrap().is_indexed());
        assert!(!entity.property("bio").unwrap().is_indexed());
        assert_eq!(entity.get("bio").and_then(Value::as_str), Some("hello"));
        assert_eq!(entity.property_names().collect::<Vec<_>>(), vec!["bio", "email"]);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(5i64).as_integer(), Some(5));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(1.5).as_double(), Some(1.5));
        assert_eq!(Value::timestamp_micros(10).as_timestamp_micros(), Some(10));
        assert_eq!(Value::from("x").as_integer(), None);

        let nested = Entity::new(user_key("n"));
        let value = Value::from(nested.clone());
        assert_eq!(value.as_entity(), Some(&nested));
        assert_eq!(value.value_type(), ValueType::Entity);
    }
}
