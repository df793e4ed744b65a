//! Protocol Buffers definitions for the dstore remote datastore API
//!
//! The message types are written out with `prost` derives instead of being
//! generated from a `.proto` file at build time. Field numbers follow the
//! datastore wire schema and must not be renumbered.

pub mod method;

pub use method::{Method, SERVICE_NAME};

// ============================================================================
// Keys
// ============================================================================

/// Partition a key lives in.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartitionId {
    #[prost(string, optional, tag = "3")]
    pub dataset_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub namespace: ::core::option::Option<::prost::alloc::string::String>,
}

/// Entity key: partition plus ancestor-to-child path.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Key {
    #[prost(message, optional, tag = "1")]
    pub partition_id: ::core::option::Option<PartitionId>,
    #[prost(message, repeated, tag = "2")]
    pub path_element: ::prost::alloc::vec::Vec<key::PathElement>,
}

/// Nested message and enum types in `Key`.
pub mod key {
    /// One (kind, id-or-name) step of a key path.
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PathElement {
        #[prost(string, tag = "1")]
        pub kind: ::prost::alloc::string::String,
        #[prost(int64, optional, tag = "2")]
        pub id: ::core::option::Option<i64>,
        #[prost(string, optional, tag = "3")]
        pub name: ::core::option::Option<::prost::alloc::string::String>,
    }
}

// ============================================================================
// Values, properties and entities
// ============================================================================

/// A single typed property value.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Value {
    #[prost(oneof = "value::ValueType", tags = "1, 2, 3, 4, 5, 6, 16, 17, 18")]
    pub value_type: ::core::option::Option<value::ValueType>,
    #[prost(int32, optional, tag = "14")]
    pub meaning: ::core::option::Option<i32>,
    #[prost(bool, tag = "15")]
    pub indexed: bool,
}

/// Nested message and enum types in `Value`.
pub mod value {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ValueType {
        #[prost(bool, tag = "1")]
        BooleanValue(bool),
        #[prost(int64, tag = "2")]
        IntegerValue(i64),
        #[prost(double, tag = "3")]
        DoubleValue(f64),
        #[prost(int64, tag = "4")]
        TimestampMicrosecondsValue(i64),
        #[prost(message, tag = "5")]
        KeyValue(super::Key),
        #[prost(message, tag = "6")]
        EntityValue(super::Entity),
        #[prost(string, tag = "16")]
        BlobKeyValue(::prost::alloc::string::String),
        #[prost(string, tag = "17")]
        StringValue(::prost::alloc::string::String),
        #[prost(bytes = "bytes", tag = "18")]
        BlobValue(::prost::bytes::Bytes),
    }
}

/// Named property holding one value, or several when `multi` is set.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Property {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub multi: bool,
    #[prost(message, repeated, tag = "3")]
    pub value: ::prost::alloc::vec::Vec<Value>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Entity {
    #[prost(message, optional, tag = "1")]
    pub key: ::core::option::Option<Key>,
    #[prost(message, repeated, tag = "2")]
    pub property: ::prost::alloc::vec::Vec<Property>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EntityResult {
    #[prost(message, optional, tag = "1")]
    pub entity: ::core::option::Option<Entity>,
}

// ============================================================================
// Queries
// ============================================================================

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KindExpression {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyReference {
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyExpression {
    #[prost(message, optional, tag = "1")]
    pub property: ::core::option::Option<PropertyReference>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyOrder {
    #[prost(message, optional, tag = "1")]
    pub property: ::core::option::Option<PropertyReference>,
    #[prost(enumeration = "property_order::Direction", tag = "2")]
    pub direction: i32,
}

/// Nested message and enum types in `PropertyOrder`.
pub mod property_order {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Direction {
        Unspecified = 0,
        Ascending = 1,
        Descending = 2,
    }
}

/// Either a single property filter or a composite of filters.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Filter {
    #[prost(message, optional, tag = "1")]
    pub composite_filter: ::core::option::Option<CompositeFilter>,
    #[prost(message, optional, tag = "2")]
    pub property_filter: ::core::option::Option<PropertyFilter>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompositeFilter {
    #[prost(enumeration = "composite_filter::Operator", tag = "1")]
    pub operator: i32,
    #[prost(message, repeated, tag = "2")]
    pub filter: ::prost::alloc::vec::Vec<Filter>,
}

/// Nested message and enum types in `CompositeFilter`.
pub mod composite_filter {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Operator {
        Unspecified = 0,
        And = 1,
        Or = 2,
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyFilter {
    #[prost(message, optional, tag = "1")]
    pub property: ::core::option::Option<PropertyReference>,
    #[prost(enumeration = "property_filter::Operator", tag = "2")]
    pub operator: i32,
    #[prost(message, optional, tag = "3")]
    pub value: ::core::option::Option<Value>,
}

/// Nested message and enum types in `PropertyFilter`.
pub mod property_filter {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Operator {
        Unspecified = 0,
        LessThan = 1,
        LessThanOrEqual = 2,
        GreaterThan = 3,
        GreaterThanOrEqual = 4,
        Equal = 5,
        HasAncestor = 11,
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(message, repeated, tag = "2")]
    pub projection: ::prost::alloc::vec::Vec<PropertyExpression>,
    #[prost(message, repeated, tag = "3")]
    pub kind: ::prost::alloc::vec::Vec<KindExpression>,
    #[prost(message, optional, tag = "4")]
    pub filter: ::core::option::Option<Filter>,
    #[prost(message, repeated, tag = "5")]
    pub order: ::prost::alloc::vec::Vec<PropertyOrder>,
    #[prost(message, repeated, tag = "6")]
    pub group_by: ::prost::alloc::vec::Vec<PropertyReference>,
    #[prost(bytes = "bytes", optional, tag = "7")]
    pub start_cursor: ::core::option::Option<::prost::bytes::Bytes>,
    #[prost(int32, tag = "10")]
    pub offset: i32,
    #[prost(int32, optional, tag = "11")]
    pub limit: ::core::option::Option<i32>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResultBatch {
    #[prost(message, repeated, tag = "2")]
    pub entity_result: ::prost::alloc::vec::Vec<EntityResult>,
    #[prost(bytes = "bytes", optional, tag = "4")]
    pub end_cursor: ::core::option::Option<::prost::bytes::Bytes>,
    #[prost(enumeration = "query_result_batch::MoreResultsType", tag = "5")]
    pub more_results: i32,
    #[prost(int32, tag = "6")]
    pub skipped_results: i32,
}

/// Nested message and enum types in `QueryResultBatch`.
pub mod query_result_batch {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum MoreResultsType {
        Unspecified = 0,
        NotFinished = 1,
        MoreResultsAfterLimit = 2,
        NoMoreResults = 3,
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// Ordered list of write operations, applied in sequence.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Mutation {
    #[prost(message, repeated, tag = "1")]
    pub operation: ::prost::alloc::vec::Vec<MutationOperation>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutationOperation {
    #[prost(oneof = "mutation_operation::Operation", tags = "1, 2, 3")]
    pub operation: ::core::option::Option<mutation_operation::Operation>,
}

/// Nested message and enum types in `MutationOperation`.
pub mod mutation_operation {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Operation {
        #[prost(message, tag = "1")]
        Upsert(super::Entity),
        #[prost(message, tag = "2")]
        InsertAutoId(super::Entity),
        #[prost(message, tag = "3")]
        Delete(super::Key),
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutationResult {
    #[prost(int32, tag = "1")]
    pub index_updates: i32,
    #[prost(message, repeated, tag = "2")]
    pub insert_auto_id_key: ::prost::alloc::vec::Vec<Key>,
}

// ============================================================================
// Requests and responses
// ============================================================================

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadOptions {
    #[prost(enumeration = "read_options::ReadConsistency", tag = "1")]
    pub read_consistency: i32,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub transaction: ::core::option::Option<::prost::bytes::Bytes>,
}

/// Nested message and enum types in `ReadOptions`.
pub mod read_options {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ReadConsistency {
        Default = 0,
        Strong = 1,
        Eventual = 2,
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupRequest {
    #[prost(message, optional, tag = "1")]
    pub read_options: ::core::option::Option<ReadOptions>,
    #[prost(message, repeated, tag = "3")]
    pub key: ::prost::alloc::vec::Vec<Key>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupResponse {
    #[prost(message, repeated, tag = "1")]
    pub found: ::prost::alloc::vec::Vec<EntityResult>,
    #[prost(message, repeated, tag = "2")]
    pub missing: ::prost::alloc::vec::Vec<EntityResult>,
    #[prost(message, repeated, tag = "3")]
    pub deferred: ::prost::alloc::vec::Vec<Key>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunQueryRequest {
    #[prost(message, optional, tag = "1")]
    pub read_options: ::core::option::Option<ReadOptions>,
    #[prost(message, optional, tag = "2")]
    pub partition_id: ::core::option::Option<PartitionId>,
    #[prost(message, optional, tag = "3")]
    pub query: ::core::option::Option<Query>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunQueryResponse {
    #[prost(message, optional, tag = "1")]
    pub batch: ::core::option::Option<QueryResultBatch>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginTransactionRequest {
    #[prost(enumeration = "begin_transaction_request::IsolationLevel", tag = "1")]
    pub isolation_level: i32,
}

/// Nested message and enum types in `BeginTransactionRequest`.
pub mod begin_transaction_request {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum IsolationLevel {
        Snapshot = 0,
        Serializable = 1,
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginTransactionResponse {
    #[prost(bytes = "bytes", tag = "1")]
    pub transaction: ::prost::bytes::Bytes,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub transaction: ::prost::bytes::Bytes,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackResponse {}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub transaction: ::prost::bytes::Bytes,
    #[prost(message, optional, tag = "2")]
    pub mutation: ::core::option::Option<Mutation>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitResponse {
    #[prost(message, optional, tag = "1")]
    pub mutation_result: ::core::option::Option<MutationResult>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlindWriteRequest {
    #[prost(message, optional, tag = "1")]
    pub mutation: ::core::option::Option<Mutation>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlindWriteResponse {
    #[prost(message, optional, tag = "1")]
    pub mutation_result: ::core::option::Option<MutationResult>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AllocateIdsRequest {
    #[prost(message, repeated, tag = "1")]
    pub key: ::prost::alloc::vec::Vec<Key>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AllocateIdsResponse {
    #[prost(message, repeated, tag = "1")]
    pub key: ::prost::alloc::vec::Vec<Key>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_key_encoding_is_deterministic() {
        let key = Key {
            partition_id: Some(PartitionId {
                dataset_id: None,
                namespace: Some("tenant".to_string()),
            }),
            path_element: vec![key::PathElement {
                kind: "User".to_string(),
                id: None,
                name: Some("alice".to_string()),
            }],
        };

        assert_eq!(key.encode_to_vec(), key.clone().encode_to_vec());
        let decoded = Key::decode(key.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_mutation_preserves_operation_order() {
        let delete = |name: &str| MutationOperation {
            operation: Some(mutation_operation::Operation::Delete(Key {
                partition_id: None,
                path_element: vec![key::PathElement {
                    kind: "K".to_string(),
                    id: None,
                    name: Some(name.to_string()),
                }],
            })),
        };
        let mutation = Mutation {
            operation: vec![delete("b"), delete("a"), delete("c")],
        };

        let decoded = Mutation::decode(mutation.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, mutation);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        // Field 9 (varint) is not part of PathElement
        let mut buf = key::PathElement {
            kind: "K".to_string(),
            id: Some(7),
            name: None,
        }
        .encode_to_vec();
        buf.extend_from_slice(&[0x48, 0x01]);

        let decoded = key::PathElement::decode(buf.as_slice()).unwrap();
        assert_eq!(decoded.id, Some(7));
    }
}
