/// Query descriptors and the builder that assembles them
use crate::{Error, Key, Result, Value, KEY_PROPERTY};

/// Sort direction of an order clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Order clause on one property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyOrder {
    pub property: String,
    pub direction: Direction,
}

/// Operator of a property filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    /// Matches entities whose key has the filter value as an ancestor
    HasAncestor,
}

/// Combinator of a composite filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOperator {
    And,
    Or,
}

/// Filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Property {
        property: String,
        operator: FilterOperator,
        value: Value,
    },
    Composite {
        operator: CompositeOperator,
        filters: Vec<Filter>,
    },
}

impl Filter {
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Property {
            property: property.into(),
            operator: FilterOperator::Equal,
            value: value.into(),
        }
    }

    /// `__key__ HAS_ANCESTOR ancestor`
    pub fn has_ancestor(ancestor: &Key) -> Self {
        Filter::Property {
            property: KEY_PROPERTY.to_string(),
            operator: FilterOperator::HasAncestor,
            value: Value::Key(ancestor.clone()),
        }
    }

    /// Combine filters; a single filter is returned unwrapped and an empty
    /// list yields `None`.
    pub fn combine(operator: CompositeOperator, mut filters: Vec<Filter>) -> Option<Filter> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::Composite { operator, filters }),
        }
    }
}

/// Which part of each matching entity the store returns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Full,
    KeysOnly,
    Properties(Vec<String>),
}

/// Complete description of a query, ready to be sent
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDescriptor {
    pub kinds: Vec<String>,
    pub filter: Option<Filter>,
    pub orders: Vec<PropertyOrder>,
    pub group_by: Vec<String>,
    pub offset: u32,
    pub limit: Option<u32>,
    pub projection: Projection,
}

impl QueryDescriptor {
    pub fn is_keys_only(&self) -> bool {
        self.projection == Projection::KeysOnly
    }
}

/// Fluent builder for [`QueryDescriptor`]
///
/// # Example
/// ```
/// use dstore_core::{Direction, QueryBuilder};
///
/// let query = QueryBuilder::new("Post")
///     .filter_eq("author", "alice")
///     .filter_eq("status", "published")
///     .order("created", Direction::Descending)
///     .limit(20)
///     .build();
///
/// assert_eq!(query.kinds, vec!["Post".to_string()]);
/// assert_eq!(query.limit, Some(20));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    kinds: Vec<String>,
    filters: Vec<Filter>,
    orders: Vec<PropertyOrder>,
    group_by: Vec<String>,
    offset: u32,
    limit: Option<u32>,
    projection: Projection,
}

impl QueryBuilder {
    /// Query over a single kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::default().kind(kind)
    }

    /// Query with no kind restriction.
    pub fn kindless() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Equality filter. Multiple filters are combined under AND.
    pub fn filter_eq(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(property, value));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Restrict results to descendants of `ancestor`.
    pub fn ancestor(mut self, ancestor: &Key) -> Self {
        self.filters.push(Filter::has_ancestor(ancestor));
        self
    }

    pub fn order(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(PropertyOrder {
            property: property.into(),
            direction,
        });
        self
    }

    pub fn order_by_key(self, direction: Direction) -> Self {
        self.order(KEY_PROPERTY, direction)
    }

    pub fn group_by(mut self, property: impl Into<String>) -> Self {
        self.group_by.push(property.into());
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set offset and limit together.
    pub fn window(self, offset: u32, limit: u32) -> Self {
        self.offset(offset).limit(limit)
    }

    /// Return only the named properties. An empty list means keys only.
    pub fn project<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = properties.into_iter().map(Into::into).collect();
        self.projection = if names.is_empty() {
            Projection::KeysOnly
        } else {
            Projection::Properties(names)
        };
        self
    }

    pub fn keys_only(mut self) -> Self {
        self.projection = Projection::KeysOnly;
        self
    }

    pub fn build(self) -> QueryDescriptor {
        QueryDescriptor {
            kinds: self.kinds,
            filter: Filter::combine(CompositeOperator::And, self.filters),
            orders: self.orders,
            group_by: self.group_by,
            offset: self.offset,
            limit: self.limit,
            projection: self.projection,
        }
    }
}

/// Query matching exactly `keys` of `kind`, as an OR of `__key__` equality
/// filters. `required_properties` behaves like [`QueryBuilder::project`].
pub fn build_key_query(kind: &str, keys: &[Key], required_properties: Option<&[&str]>) -> Result<QueryDescriptor> {
    if keys.is_empty() {
        return Err(Error::InvalidQuery("key query needs at least one key".to_string()));
    }

    let filters = keys
        .iter()
        .map(|key| Filter::eq(KEY_PROPERTY, key.clone()))
        .collect();

    let mut builder = QueryBuilder::new(kind);
    if let Some(filter) = Filter::combine(CompositeOperator::Or, filters) {
        builder = builder.filter(filter);
    }
    if let Some(properties) = required_properties {
        builder = builder.project(properties.iter().copied());
    }
    Ok(builder.build())
}
