/// Transactions: server-issued handle plus the buffered writes
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use dstore_core::{Entity, Key, MutationBuffer, MutationOp};
use std::fmt;
use tracing::{debug, info};

/// Opaque transaction handle issued by the store
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(Bytes);

impl TransactionId {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(&self.0))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self)
    }
}

/// An open transaction.
///
/// Writes are buffered locally until [`crate::Client::commit_transaction`]
/// consumes the transaction, so a finished transaction cannot be reused.
///
/// # Example
/// ```no_run
/// # use dstore_client::Client;
/// # use dstore_core::{Entity, PathBuilder, Property};
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let key = PathBuilder::new().name("Account", "alice").build()?;
///
/// let mut tx = client.new_transaction().await?;
/// let current = client.get_entities_in(&tx, &[key.clone()]).await?;
/// tx.upsert(Entity::new(key).with_property(Property::new("balance", 10i64)))?;
/// client.commit_transaction(tx).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    buffer: MutationBuffer,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            buffer: MutationBuffer::new(),
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn upsert(&mut self, entity: Entity) -> Result<()> {
        Ok(self.buffer.add_upsert(entity)?)
    }

    pub fn insert_auto_id(&mut self, entity: Entity) -> Result<()> {
        Ok(self.buffer.add_insert_auto_id(entity)?)
    }

    pub fn delete(&mut self, key: Key) -> Result<()> {
        Ok(self.buffer.add_delete(key)?)
    }

    pub fn push(&mut self, ops: impl IntoIterator<Item = MutationOp>) -> Result<()> {
        Ok(self.buffer.extend(ops)?)
    }

    /// Number of buffered operations.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Send the buffered writes; returns keys generated for insert-auto-id operations.
    pub(crate) async fn commit(mut self, connection: &Connection) -> Result<Vec<Key>> {
        let mutation = self.buffer.drain()?;
        debug!(transaction = %self.id, operations = mutation.len(), "Committing transaction");
        let keys = connection.commit(&self.id, mutation).await?;
        info!(transaction = %self.id, generated_keys = keys.len(), "Transaction committed");
        Ok(keys)
    }

    /// Discard the buffered writes and release the handle on the store.
    pub(crate) async fn rollback(self, connection: &Connection) -> Result<()> {
        debug!(transaction = %self.id, discarded = self.buffer.len(), "Rolling back transaction");
        connection.rollback(&self.id).await?;
        info!(transaction = %self.id, "Transaction rolled back");
        Ok(())
    }
}

/// Holds the client's single active transaction.
///
/// Idle (no transaction) or Active (exactly one). Commit and rollback always
/// return the manager to Idle before any network call is made, so a failed
/// call never leaves a half-finished transaction behind.
#[derive(Debug, Default)]
pub struct TransactionManager {
    current: Option<Transaction>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_transaction(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Transaction> {
        self.current.as_ref()
    }

    /// Handle of the active transaction, if any.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.current.as_ref().map(Transaction::id)
    }

    /// The active transaction, for buffering writes.
    pub fn active_mut(&mut self) -> Result<&mut Transaction> {
        self.current.as_mut().ok_or(ClientError::NotInTransaction)
    }

    /// Open a transaction on the store and make it the active one.
    pub async fn begin(&mut self, connection: &Connection) -> Result<TransactionId> {
        if self.current.is_some() {
            return Err(ClientError::AlreadyInTransaction);
        }
        let id = connection.begin_transaction().await?;
        info!(transaction = %id, "Transaction started");
        self.current = Some(Transaction::new(id.clone()));
        Ok(id)
    }

    pub async fn commit(&mut self, connection: &Connection) -> Result<Vec<Key>> {
        let transaction = self.current.take().ok_or(ClientError::NotInTransaction)?;
        transaction.commit(connection).await
    }

    /// Roll back the active transaction. Returns `false`, without contacting
    /// the store, when there is none.
    pub async fn rollback(&mut self, connection: &Connection) -> Result<bool> {
        match self.current.take() {
            Some(transaction) => {
                transaction.rollback(connection).await?;
                Ok(true)
            }
            None => {
                debug!("Rollback requested with no active transaction");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_display_is_base64() {
        let id = TransactionId::from_bytes(Bytes::from_static(b"\x01\x02\x03"));
        assert_eq!(id.to_string(), "AQID");
        assert_eq!(format!("{:?}", id), "TransactionId(AQID)");
    }

    #[test]
    fn test_transaction_buffers_in_order() {
        let key = dstore_core::PathBuilder::new().name("K", "a").build().unwrap();
        let mut tx = Transaction::new(TransactionId::from_bytes(Bytes::from_static(b"t")));
        tx.upsert(Entity::new(key.clone())).unwrap();
        tx.delete(key).unwrap();
        assert_eq!(tx.pending(), 2);
    }

    #[test]
    fn test_idle_manager() {
        let mut manager = TransactionManager::new();
        assert!(!manager.in_transaction());
        assert!(manager.transaction_id().is_none());
        assert!(matches!(manager.active_mut(), Err(ClientError::NotInTransaction)));
    }
}
