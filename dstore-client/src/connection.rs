/// Typed RPC layer over a [`Transport`]
use crate::error::{ClientError, Result};
use crate::transaction::TransactionId;
use crate::transport::Transport;
use bytes::Bytes;
use dstore_core::wire::{key_from_proto, key_to_proto, mutation_to_proto, partition_id, query_to_proto};
use dstore_core::{Key, Mutation, QueryDescriptor, RetryPolicy};
use dstore_proto::{self as proto, Method};
use prost::Message;
use std::sync::Arc;
use tracing::{debug, warn};

/// Encodes requests, decodes responses and retries calls the store could not
/// serve (`Unavailable`) with linear backoff.
#[derive(Clone)]
pub struct Connection {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl Connection {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Issue one RPC. Failures of mutating methods are reported as
    /// [`ClientError::RemoteMutation`].
    pub async fn call<Req, Resp>(&self, method: Method, request: &Req) -> Result<Resp>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let payload = Bytes::from(request.encode_to_vec());

        let response = match self.call_with_retry(method, payload).await {
            Ok(response) => response,
            Err(e) if method.is_mutation() => return Err(ClientError::remote_mutation(method, e)),
            Err(e) => return Err(e),
        };

        Resp::decode(response).map_err(|e| ClientError::Decode {
            method,
            message: e.to_string(),
        })
    }

    async fn call_with_retry(&self, method: Method, payload: Bytes) -> Result<Bytes> {
        let mut attempt = 0;
        loop {
            debug!(method = %method, bytes = payload.len(), attempt, "RPC");
            match self.transport.call(method, payload.clone()).await {
                Ok(response) => {
                    debug!(method = %method, bytes = response.len(), "RPC complete");
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && self.retry.allows(attempt + 1) => {
                    attempt += 1;
                    let backoff = self.retry.backoff_duration(attempt);
                    warn!(
                        method = %method,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Store unavailable, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    debug!(method = %method, error = %e, "RPC failed");
                    return Err(e);
                }
            }
        }
    }

    pub async fn lookup(&self, keys: &[Key], transaction: Option<&TransactionId>) -> Result<proto::LookupResponse> {
        let request = proto::LookupRequest {
            read_options: read_options(transaction),
            key: keys.iter().map(key_to_proto).collect(),
        };
        self.call(Method::Lookup, &request).await
    }

    pub async fn run_query(
        &self,
        query: &QueryDescriptor,
        namespace: Option<&str>,
        transaction: Option<&TransactionId>,
    ) -> Result<proto::QueryResultBatch> {
        let request = proto::RunQueryRequest {
            read_options: read_options(transaction),
            partition_id: partition_id(namespace),
            query: Some(query_to_proto(query)),
        };
        let response: proto::RunQueryResponse = self.call(Method::RunQuery, &request).await?;
        Ok(response.batch.unwrap_or_default())
    }

    pub async fn begin_transaction(&self) -> Result<TransactionId> {
        let request = proto::BeginTransactionRequest::default();
        let response: proto::BeginTransactionResponse = self.call(Method::BeginTransaction, &request).await?;
        if response.transaction.is_empty() {
            return Err(ClientError::Decode {
                method: Method::BeginTransaction,
                message: "store returned an empty transaction handle".to_string(),
            });
        }
        Ok(TransactionId::from_bytes(response.transaction))
    }

    /// Commit `mutation` under `transaction`; returns keys generated for
    /// insert-auto-id operations, in operation order.
    pub async fn commit(&self, transaction: &TransactionId, mutation: Mutation) -> Result<Vec<Key>> {
        let request = proto::CommitRequest {
            transaction: transaction.as_bytes().clone(),
            mutation: Some(mutation_to_proto(mutation)),
        };
        let response: proto::CommitResponse = self.call(Method::Commit, &request).await?;
        generated_keys(Method::Commit, response.mutation_result)
    }

    pub async fn rollback(&self, transaction: &TransactionId) -> Result<()> {
        let request = proto::RollbackRequest {
            transaction: transaction.as_bytes().clone(),
        };
        let _: proto::RollbackResponse = self.call(Method::Rollback, &request).await?;
        Ok(())
    }

    /// Apply `mutation` outside any transaction.
    pub async fn blind_write(&self, mutation: Mutation) -> Result<Vec<Key>> {
        let request = proto::BlindWriteRequest {
            mutation: Some(mutation_to_proto(mutation)),
        };
        let response: proto::BlindWriteResponse = self.call(Method::BlindWrite, &request).await?;
        generated_keys(Method::BlindWrite, response.mutation_result)
    }

    /// Reserve ids for incomplete keys; returns the completed keys.
    pub async fn allocate_ids(&self, keys: &[Key]) -> Result<Vec<Key>> {
        let request = proto::AllocateIdsRequest {
            key: keys.iter().map(key_to_proto).collect(),
        };
        let response: proto::AllocateIdsResponse = self.call(Method::AllocateIds, &request).await?;
        response
            .key
            .into_iter()
            .map(|k| key_from_proto(k).map_err(ClientError::from))
            .collect()
    }
}

fn read_options(transaction: Option<&TransactionId>) -> Option<proto::ReadOptions> {
    transaction.map(|tx| proto::ReadOptions {
        read_consistency: proto::read_options::ReadConsistency::Default as i32,
        transaction: Some(tx.as_bytes().clone()),
    })
}

fn generated_keys(method: Method, result: Option<proto::MutationResult>) -> Result<Vec<Key>> {
    let Some(result) = result else {
        return Ok(Vec::new());
    };
    debug!(method = %method, index_updates = result.index_updates, "Mutation applied");
    result
        .insert_auto_id_key
        .into_iter()
        .map(|k| key_from_proto(k).map_err(ClientError::from))
        .collect()
}
