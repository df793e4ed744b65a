//! RPC method table of the datastore service

use std::fmt;

/// Fully qualified gRPC service name.
pub const SERVICE_NAME: &str = "dstore.v1.Datastore";

/// Remote procedures exposed by the datastore service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Lookup,
    RunQuery,
    BeginTransaction,
    Commit,
    Rollback,
    BlindWrite,
    AllocateIds,
}

impl Method {
    /// All methods, in declaration order.
    pub const ALL: [Method; 7] = [
        Method::Lookup,
        Method::RunQuery,
        Method::BeginTransaction,
        Method::Commit,
        Method::Rollback,
        Method::BlindWrite,
        Method::AllocateIds,
    ];

    /// Method name as used by the datastore API (e.g. `runQuery`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Lookup => "lookup",
            Method::RunQuery => "runQuery",
            Method::BeginTransaction => "beginTransaction",
            Method::Commit => "commit",
            Method::Rollback => "rollback",
            Method::BlindWrite => "blindWrite",
            Method::AllocateIds => "allocateIds",
        }
    }

    /// gRPC request path (`/dstore.v1.Datastore/RunQuery`).
    pub fn path(&self) -> &'static str {
        match self {
            Method::Lookup => "/dstore.v1.Datastore/Lookup",
            Method::RunQuery => "/dstore.v1.Datastore/RunQuery",
            Method::BeginTransaction => "/dstore.v1.Datastore/BeginTransaction",
            Method::Commit => "/dstore.v1.Datastore/Commit",
            Method::Rollback => "/dstore.v1.Datastore/Rollback",
            Method::BlindWrite => "/dstore.v1.Datastore/BlindWrite",
            Method::AllocateIds => "/dstore.v1.Datastore/AllocateIds",
        }
    }

    /// True for methods that write to the store.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Method::Commit | Method::BlindWrite)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
