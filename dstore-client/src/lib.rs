//! Client for the dstore hierarchical document store
//!
//! This crate provides the I/O side of the client: the gRPC transport, typed
//! RPCs with transient-error retry, transactions, deferred-lookup retry and
//! the [`Client`] facade.

pub mod error;
pub mod transport;
pub mod connection;
pub mod transaction;
pub mod lookup;
pub mod client;

// Re-export key types
pub use client::Client;
pub use connection::Connection;
pub use error::{ClientError, Result};
pub use lookup::{LookupResults, LookupRetrier};
pub use transaction::{Transaction, TransactionId, TransactionManager};
pub use transport::{GrpcTransport, Transport};
pub use dstore_core::{ClientConfig, EncodedKey, Entity, Key, PathBuilder, Property, QueryBuilder, Value};
pub use dstore_proto::Method;
