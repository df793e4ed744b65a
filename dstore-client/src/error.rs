/// Error types for the dstore client
use dstore_proto::Method;
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] dstore_core::Error),

    #[error("A transaction is already in progress")]
    AlreadyInTransaction,

    #[error("No transaction in progress")]
    NotInTransaction,

    #[error("Lookup still deferred after {retries} retries ({} keys pending)", pending.len())]
    RetryLimitExceeded {
        retries: u32,
        /// Encoded keys the store kept deferring
        pending: Vec<String>,
    },

    #[error("Store rejected {operation}: {source}")]
    RemoteMutation {
        operation: Method,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Internal store error: {0}")]
    InternalError(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Failed to decode {method} response: {message}")]
    Decode { method: Method, message: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// True for failures worth retrying unchanged: the store was unavailable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Unavailable(_))
    }

    /// Wrap a failed mutating call so callers can tell the store refused a write.
    pub(crate) fn remote_mutation(operation: Method, source: ClientError) -> Self {
        ClientError::RemoteMutation {
            operation,
            source: Box::new(source),
        }
    }
}

/// Convert gRPC Status to ClientError
impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        let msg = status.message().to_string();

        match status.code() {
            tonic::Code::NotFound => ClientError::NotFound(msg),
            tonic::Code::InvalidArgument => ClientError::InvalidArgument(msg),
            tonic::Code::Unavailable => ClientError::Unavailable(msg),
            tonic::Code::DeadlineExceeded => ClientError::Timeout(msg),
            tonic::Code::Internal => ClientError::InternalError(msg),
            tonic::Code::Aborted => ClientError::TransactionAborted(msg),
            tonic::Code::AlreadyExists => ClientError::AlreadyExists(msg),
            tonic::Code::ResourceExhausted => ClientError::ResourceExhausted(msg),
            tonic::Code::PermissionDenied => ClientError::PermissionDenied(msg),
            tonic::Code::Unauthenticated => ClientError::Unauthenticated(msg),
            _ => ClientError::Unknown(msg),
        }
    }
}

impl From<tonic::transport::Error> for ClientError {
    fn from(err: tonic::transport::Error) -> Self {
        ClientError::ConnectionError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ClientError::from(Status::unavailable("busy")),
            ClientError::Unavailable(m) if m == "busy"
        ));
        assert!(matches!(
            ClientError::from(Status::deadline_exceeded("slow")),
            ClientError::Timeout(_)
        ));
        assert!(matches!(
            ClientError::from(Status::unauthenticated("token")),
            ClientError::Unauthenticated(_)
        ));
        assert!(matches!(
            ClientError::from(Status::data_loss("x")),
            ClientError::Unknown(_)
        ));
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(ClientError::Unavailable("x".into()).is_retryable());
        assert!(!ClientError::Timeout("x".into()).is_retryable());
        assert!(!ClientError::InvalidArgument("x".into()).is_retryable());
        assert!(!ClientError::NotInTransaction.is_retryable());
    }

    #[test]
    fn test_remote_mutation_keeps_source() {
        let err = ClientError::remote_mutation(Method::Commit, ClientError::TransactionAborted("conflict".into()));
        assert_eq!(err.to_string(), "Store rejected commit: Transaction aborted: conflict");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_core_errors_are_transparent() {
        let err = ClientError::from(dstore_core::Error::MutationDrained);
        assert_eq!(err.to_string(), "Mutation buffer already drained");
    }
}
