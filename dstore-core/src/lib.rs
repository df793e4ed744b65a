//! Client-side data model of the document store: keys, entities, queries,
//! mutations and their wire conversions. No I/O happens in this crate.

pub mod error;
pub mod key;
pub mod codec;
pub mod entity;
pub mod query;
pub mod mutation;
pub mod wire;
pub mod config;
pub mod retry;

pub use error::{Error, Result};
pub use key::{parse_path, Key, PathBuilder, PathElement, PathId, KEY_PROPERTY};
pub use codec::{EncodedKey, KeyCodec};
pub use entity::{Entity, Property, Value, ValueType};
pub use query::{
    build_key_query, CompositeOperator, Direction, Filter, FilterOperator, Projection, PropertyOrder,
    QueryBuilder, QueryDescriptor,
};
pub use mutation::{Mutation, MutationBuffer, MutationOp};
pub use config::ClientConfig;
pub use retry::RetryPolicy;
