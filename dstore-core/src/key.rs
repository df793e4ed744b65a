use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Reserved property name that refers to an entity's own key in filters and orders.
pub const KEY_PROPERTY: &str = "__key__";

/// Identifier of a single path element: store-assigned id or caller-assigned name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathId {
    Id(i64),
    Name(String),
}

/// One (kind, id-or-name) step of a key path.
///
/// An element without an id is *incomplete*; it is only valid as the last
/// element of a key handed to an insert-with-generated-id operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathElement {
    pub kind: String,
    pub id: Option<PathId>,
}

impl PathElement {
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(PathId::Name(name.into())),
        }
    }

    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id: Some(PathId::Id(id)),
        }
    }

    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> Option<i64> {
        match &self.id {
            Some(PathId::Id(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.id {
            Some(PathId::Name(name)) => Some(name),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.id.is_some()
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(PathId::Name(name)) => write!(f, "{}:{}", self.kind, name),
            Some(PathId::Id(id)) => write!(f, "{}:#{}", self.kind, id),
            None => write!(f, "{}:?", self.kind),
        }
    }
}

/// Parses `Kind:name` or `Kind:#id`.
impl FromStr for PathElement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, ident) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidPath(format!("expected Kind:name or Kind:#id, got '{}'", s)))?;

        if kind.is_empty() {
            return Err(Error::InvalidPath(format!("missing kind in '{}'", s)));
        }

        match ident.strip_prefix('#') {
            Some(digits) => {
                let id = digits
                    .parse::<i64>()
                    .map_err(|e| Error::InvalidPath(format!("bad id in '{}': {}", s, e)))?;
                Ok(PathElement::with_id(kind, id))
            }
            None if ident.is_empty() => Err(Error::InvalidPath(format!("missing name in '{}'", s))),
            None => Ok(PathElement::with_name(kind, ident)),
        }
    }
}

/// Parses a `/`-separated path such as `User:alice/Post:#12`.
pub fn parse_path(s: &str) -> Result<Vec<PathElement>> {
    s.split('/')
        .filter(|part| !part.is_empty())
        .map(PathElement::from_str)
        .collect()
}

/// Entity key: optional namespace plus a non-empty ancestor-to-child path.
///
/// Keys are immutable value objects; two keys are equal exactly when their
/// canonical encodings (see [`crate::codec::KeyCodec`]) are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    namespace: Option<String>,
    path: Vec<PathElement>,
}

impl Key {
    /// Build a complete key from a path and an optional namespace.
    pub fn from_path<I>(path: I, namespace: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = PathElement>,
    {
        let mut builder = PathBuilder::new().extend(path);
        if let Some(ns) = namespace {
            builder = builder.namespace(ns);
        }
        builder.build()
    }

    /// Build a key whose final element has no id yet, scoped under `ancestor` if given.
    pub fn incomplete(kind: impl Into<String>, ancestor: Option<&Key>) -> Result<Self> {
        let builder = match ancestor {
            Some(parent) => PathBuilder::new().ancestor(parent),
            None => PathBuilder::new(),
        };
        builder.build_incomplete(kind)
    }

    /// Assemble a key without completeness checks. Callers guarantee a non-empty path.
    pub(crate) fn from_parts(namespace: Option<String>, path: Vec<PathElement>) -> Self {
        debug_assert!(!path.is_empty());
        Self {
            namespace: normalize_namespace(namespace),
            path,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// The path as an owned list, the inverse of [`Key::from_path`].
    pub fn to_path(&self) -> Vec<PathElement> {
        self.path.clone()
    }

    /// Final path element.
    pub fn leaf(&self) -> &PathElement {
        // path is non-empty by construction
        &self.path[self.path.len() - 1]
    }

    pub fn kind(&self) -> &str {
        self.leaf().kind()
    }

    pub fn id(&self) -> Option<i64> {
        self.leaf().id()
    }

    pub fn name(&self) -> Option<&str> {
        self.leaf().name()
    }

    pub fn is_complete(&self) -> bool {
        self.path.iter().all(PathElement::is_complete)
    }

    /// Key of the immediate ancestor, if any.
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Key::from_parts(
            self.namespace.clone(),
            self.path[..self.path.len() - 1].to_vec(),
        ))
    }

    /// True if `self` is a strict ancestor of `other` in the same namespace.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        self.namespace == other.namespace
            && other.path.len() > self.path.len()
            && other.path.starts_with(&self.path)
    }

    /// Extend this key by one complete element.
    pub fn child(&self, element: PathElement) -> Result<Key> {
        PathBuilder::new().ancestor(self).element(element).build()
    }

    /// Copy of this key with the final element resolved to `id`.
    pub fn with_id(&self, id: i64) -> Key {
        let mut path = self.path.clone();
        let last = path.len() - 1;
        path[last].id = Some(PathId::Id(id));
        Key::from_parts(self.namespace.clone(), path)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", element)?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, " [{}]", ns)?;
        }
        Ok(())
    }
}

fn normalize_namespace(namespace: Option<String>) -> Option<String> {
    namespace.filter(|ns| !ns.is_empty())
}

/// Builder converting an ancestor-to-child path description into a [`Key`].
///
/// # Example
/// ```
/// use dstore_core::PathBuilder;
///
/// let key = PathBuilder::new()
///     .namespace("tenant-a")
///     .name("Blog", "engineering")
///     .id("Post", 42)
///     .build()
///     .unwrap();
///
/// assert_eq!(key.kind(), "Post");
/// assert_eq!(key.id(), Some(42));
/// assert_eq!(key.parent().unwrap().name(), Some("engineering"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    namespace: Option<String>,
    path: Vec<PathElement>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace. An empty string means the default namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = normalize_namespace(Some(namespace.into()));
        self
    }

    /// Start from an existing key: its path becomes the ancestor path and its
    /// namespace is inherited.
    pub fn ancestor(mut self, key: &Key) -> Self {
        self.namespace = key.namespace.clone();
        self.path.extend(key.path.iter().cloned());
        self
    }

    pub fn element(mut self, element: PathElement) -> Self {
        self.path.push(element);
        self
    }

    pub fn name(self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.element(PathElement::with_name(kind, name))
    }

    pub fn id(self, kind: impl Into<String>, id: i64) -> Self {
        self.element(PathElement::with_id(kind, id))
    }

    pub fn extend<I>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = PathElement>,
    {
        self.path.extend(elements);
        self
    }

    /// Build a complete key. Fails if the path is empty or any element lacks
    /// both id and name.
    pub fn build(self) -> Result<Key> {
        if self.path.is_empty() {
            return Err(Error::InvalidPath("path is empty".to_string()));
        }
        validate_elements(&self.path)?;
        Ok(Key::from_parts(self.namespace, self.path))
    }

    /// Build a key with an incomplete final element of `kind` under the
    /// (possibly empty) path collected so far.
    pub fn build_incomplete(mut self, kind: impl Into<String>) -> Result<Key> {
        validate_elements(&self.path)?;
        let kind = kind.into();
        if kind.is_empty() {
            return Err(Error::InvalidPath("element has an empty kind".to_string()));
        }
        self.path.push(PathElement::incomplete(kind));
        Ok(Key::from_parts(self.namespace, self.path))
    }
}

fn validate_elements(path: &[PathElement]) -> Result<()> {
    for (position, element) in path.iter().enumerate() {
        if element.kind.is_empty() {
            return Err(Error::InvalidPath(format!(
                "element {} has an empty kind",
                position
            )));
        }
        if !element.is_complete() {
            return Err(Error::InvalidPath(format!(
                "element {} ({}) has neither id nor name",
                position, element.kind
            )));
        }
    }
    Ok(())
}
