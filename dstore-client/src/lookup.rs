/// Key lookups that resolve deferred results
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::transaction::TransactionId;
use dstore_core::wire::{entity_from_proto, key_from_proto};
use dstore_core::{EncodedKey, Entity, Key, RetryPolicy};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Lookup results keyed by encoded key: `Some` when found, `None` when missing
pub type LookupResults = HashMap<EncodedKey, Option<Entity>>;

/// Fetches entities by key, re-requesting keys the store deferred.
///
/// Deferred keys are retried after `n × base_delay` for retry `n`, up to the
/// policy's budget. If keys are still deferred after the last retry the
/// lookup fails with [`ClientError::RetryLimitExceeded`].
pub struct LookupRetrier<'a> {
    connection: &'a Connection,
    policy: RetryPolicy,
}

impl<'a> LookupRetrier<'a> {
    pub fn new(connection: &'a Connection, policy: RetryPolicy) -> Self {
        Self { connection, policy }
    }

    pub async fn get_entities(&self, keys: &[Key], transaction: Option<&TransactionId>) -> Result<LookupResults> {
        let mut results = LookupResults::with_capacity(keys.len());
        if keys.is_empty() {
            return Ok(results);
        }

        let mut pending = dedup(keys);
        let mut attempt = 0u32;

        loop {
            let response = self.connection.lookup(&pending, transaction).await?;

            for found in response.found {
                if let Some(entity) = found.entity {
                    let entity = entity_from_proto(entity)?;
                    results.insert(entity.key().encode(), Some(entity));
                }
            }
            for missing in response.missing {
                if let Some(key) = missing.entity.and_then(|e| e.key) {
                    results.insert(key_from_proto(key)?.encode(), None);
                }
            }
            let deferred = response
                .deferred
                .into_iter()
                .map(key_from_proto)
                .collect::<dstore_core::Result<Vec<_>>>()?;

            if deferred.is_empty() {
                break;
            }

            if !self.policy.allows(attempt + 1) {
                warn!(retries = attempt, pending = deferred.len(), "Lookup retry budget exhausted");
                return Err(ClientError::RetryLimitExceeded {
                    retries: attempt,
                    pending: deferred.iter().map(|k| k.encode().into_string()).collect(),
                });
            }

            attempt += 1;
            let backoff = self.policy.backoff_duration(attempt);
            warn!(
                attempt,
                deferred = deferred.len(),
                backoff_ms = backoff.as_millis() as u64,
                "Lookup results deferred, retrying"
            );
            tokio::time::sleep(backoff).await;
            pending = deferred;
        }

        // keys the store did not mention are treated as missing
        for key in keys {
            results.entry(key.encode()).or_insert(None);
        }

        debug!(
            requested = keys.len(),
            found = results.values().filter(|v| v.is_some()).count(),
            retries = attempt,
            "Lookup complete"
        );
        Ok(results)
    }

    /// Fetch one entity.
    pub async fn get_entity(&self, key: &Key, transaction: Option<&TransactionId>) -> Result<Option<Entity>> {
        let mut results = self.get_entities(std::slice::from_ref(key), transaction).await?;
        Ok(results.remove(&key.encode()).flatten())
    }
}

fn dedup(keys: &[Key]) -> Vec<Key> {
    let mut seen = std::collections::HashSet::with_capacity(keys.len());
    keys.iter()
        .filter(|k| seen.insert(k.encode()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstore_core::PathBuilder;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = PathBuilder::new().name("K", "a").build().unwrap();
        let b = PathBuilder::new().name("K", "b").build().unwrap();
        assert_eq!(dedup(&[a.clone(), b.clone(), a.clone()]), vec![a, b]);
    }
}
