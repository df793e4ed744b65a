/// Datastore client facade
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::lookup::{LookupResults, LookupRetrier};
use crate::transaction::{Transaction, TransactionId, TransactionManager};
use crate::transport::{GrpcTransport, Transport};
use dstore_core::wire::entity_from_proto;
use dstore_core::{
    build_key_query, ClientConfig, Direction, Entity, Key, MutationOp, PathBuilder, PathElement, QueryBuilder,
    QueryDescriptor,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Datastore client
///
/// Reads take `&self`; writes and transaction control take `&mut self`, so a
/// client is driven by one unit of work at a time. Use one client per
/// concurrent task.
pub struct Client {
    config: ClientConfig,
    connection: Connection,
    transactions: TransactionManager,
}

impl Client {
    /// Connect to the store described by `config`
    ///
    /// # Example
    /// ```no_run
    /// # use dstore_client::Client;
    /// # use dstore_core::ClientConfig;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ClientConfig::new("my-dataset").with_access_token("ya29.token");
    /// let client = Client::connect(config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let transport = GrpcTransport::connect(&config).await?;
        info!(host = %config.host, dataset = %config.dataset, "Connected to datastore");
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client over any [`Transport`].
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let connection = Connection::new(transport, config.transport_retry);
        Ok(Self {
            config,
            connection,
            transactions: TransactionManager::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn namespace(&self) -> Option<&str> {
        self.config.namespace()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Build a complete key in the client's namespace.
    pub fn make_key<I>(&self, path: I) -> Result<Key>
    where
        I: IntoIterator<Item = PathElement>,
    {
        Ok(Key::from_path(path, self.namespace())?)
    }

    /// Build an incomplete key of `kind` in the client's namespace, for
    /// insert-auto-id writes.
    pub fn make_incomplete_key(&self, kind: &str, ancestor: Option<&Key>) -> Result<Key> {
        let builder = match ancestor {
            Some(parent) => PathBuilder::new().ancestor(parent),
            None => self.namespace().map(|ns| PathBuilder::new().namespace(ns)).unwrap_or_default(),
        };
        Ok(builder.build_incomplete(kind)?)
    }

    fn child_key(&self, ancestor: Option<&Key>, element: PathElement) -> Result<Key> {
        match ancestor {
            Some(parent) => Ok(parent.child(element)?),
            None => self.make_key([element]),
        }
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Start the client's transaction. Fails with
    /// [`ClientError::AlreadyInTransaction`] if one is open.
    pub async fn begin_transaction(&mut self) -> Result<TransactionId> {
        self.transactions.begin(&self.connection).await
    }

    pub fn in_transaction(&self) -> bool {
        self.transactions.in_transaction()
    }

    /// Handle of the open transaction, if any.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transactions.transaction_id()
    }

    /// Commit the open transaction; returns keys generated for its
    /// insert-auto-id writes. The client is idle afterwards whatever the outcome.
    pub async fn commit(&mut self) -> Result<Vec<Key>> {
        self.transactions.commit(&self.connection).await
    }

    /// Roll back the open transaction. Returns `false` if there was none.
    pub async fn rollback(&mut self) -> Result<bool> {
        self.transactions.rollback(&self.connection).await
    }

    /// Start a transaction that is not tied to the client's own transaction slot.
    pub async fn new_transaction(&self) -> Result<Transaction> {
        let id = self.connection.begin_transaction().await?;
        info!(transaction = %id, "Detached transaction started");
        Ok(Transaction::new(id))
    }

    pub async fn commit_transaction(&self, transaction: Transaction) -> Result<Vec<Key>> {
        transaction.commit(&self.connection).await
    }

    pub async fn rollback_transaction(&self, transaction: Transaction) -> Result<()> {
        transaction.rollback(&self.connection).await
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Route `ops` to the open transaction, an implicit transaction, or a
    /// blind write. Returns generated keys unless the ops were only buffered.
    async fn write_ops(&mut self, ops: Vec<MutationOp>, use_transaction: bool) -> Result<Option<Vec<Key>>> {
        if let Some(transaction) = self.transactions.current() {
            debug!(transaction = %transaction.id(), operations = ops.len(), "Buffering writes");
            self.transactions.active_mut()?.push(ops)?;
            return Ok(None);
        }

        if use_transaction {
            return self.write_in_implicit_transaction(ops).await.map(Some);
        }

        debug!(operations = ops.len(), "Blind write");
        let mutation = ops.into_iter().collect();
        self.connection.blind_write(mutation).await.map(Some)
    }

    async fn write_in_implicit_transaction(&mut self, ops: Vec<MutationOp>) -> Result<Vec<Key>> {
        self.transactions.begin(&self.connection).await?;

        // Buffering: nothing has been sent, so failures roll back
        let buffered = match self.transactions.active_mut() {
            Ok(transaction) => transaction.push(ops),
            Err(e) => Err(e),
        };
        if let Err(e) = buffered {
            warn!(error = %e, "Rolling back implicit transaction");
            if let Err(rollback_err) = self.transactions.rollback(&self.connection).await {
                warn!(error = %rollback_err, "Rollback of implicit transaction failed");
            }
            return Err(e);
        }

        // Committing: the outcome is the store's, never roll back from here
        self.transactions.commit(&self.connection).await
    }

    /// Upsert `entities`. With no open transaction they are committed in an
    /// implicit transaction, or sent as a blind write if `use_transaction`
    /// is false.
    pub async fn write_entities(&mut self, entities: Vec<Entity>, use_transaction: bool) -> Result<()> {
        for entity in &entities {
            require_complete(entity.key(), "upsert")?;
        }
        let ops = entities.into_iter().map(MutationOp::Upsert).collect();
        self.write_ops(ops, use_transaction).await.map(|_| ())
    }

    /// Upsert one entity, blind unless a transaction is open.
    pub async fn write_entity(&mut self, entity: Entity) -> Result<()> {
        self.write_entities(vec![entity], false).await
    }

    /// Insert `entities`, letting the store assign ids to incomplete keys.
    ///
    /// Returns the generated keys, or `None` if the writes were buffered in
    /// the open transaction (the keys are then returned by [`Client::commit`]).
    pub async fn insert_auto_id_multi(&mut self, entities: Vec<Entity>, use_transaction: bool) -> Result<Option<Vec<Key>>> {
        let ops = entities.into_iter().map(MutationOp::InsertAutoId).collect();
        self.write_ops(ops, use_transaction).await
    }

    /// Insert one entity with a generated id, blind unless a transaction is open.
    pub async fn insert_auto_id(&mut self, entity: Entity) -> Result<Option<Key>> {
        let keys = self.insert_auto_id_multi(vec![entity], false).await?;
        Ok(keys.and_then(|keys| keys.into_iter().next()))
    }

    pub async fn delete_multi(&mut self, keys: Vec<Key>, use_transaction: bool) -> Result<()> {
        for key in &keys {
            require_complete(key, "delete")?;
        }
        let ops = keys.into_iter().map(MutationOp::Delete).collect();
        self.write_ops(ops, use_transaction).await.map(|_| ())
    }

    /// Delete one entity, blind unless a transaction is open.
    pub async fn delete(&mut self, key: Key) -> Result<()> {
        self.delete_multi(vec![key], false).await
    }

    pub async fn delete_by_path(&mut self, path: Vec<PathElement>) -> Result<()> {
        let key = self.make_key(path)?;
        self.delete(key).await
    }

    /// Reserve ids for incomplete keys without writing anything.
    pub async fn allocate_ids(&self, keys: &[Key]) -> Result<Vec<Key>> {
        self.connection.allocate_ids(keys).await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    fn lookup(&self) -> LookupRetrier<'_> {
        LookupRetrier::new(&self.connection, self.config.lookup_retry)
    }

    /// Fetch entities by key, inside the open transaction if there is one.
    pub async fn get_entities(&self, keys: &[Key]) -> Result<LookupResults> {
        self.lookup()
            .get_entities(keys, self.transactions.transaction_id())
            .await
    }

    /// Fetch entities by key inside a detached transaction.
    pub async fn get_entities_in(&self, transaction: &Transaction, keys: &[Key]) -> Result<LookupResults> {
        self.lookup().get_entities(keys, Some(transaction.id())).await
    }

    pub async fn get_entity(&self, key: &Key) -> Result<Option<Entity>> {
        self.lookup()
            .get_entity(key, self.transactions.transaction_id())
            .await
    }

    pub async fn get_entity_by_name(&self, kind: &str, name: &str, ancestor: Option<&Key>) -> Result<Option<Entity>> {
        let key = self.child_key(ancestor, PathElement::with_name(kind, name))?;
        self.get_entity(&key).await
    }

    pub async fn get_entity_by_id(&self, kind: &str, id: i64, ancestor: Option<&Key>) -> Result<Option<Entity>> {
        let key = self.child_key(ancestor, PathElement::with_id(kind, id))?;
        self.get_entity(&key).await
    }

    pub async fn get_entity_by_path(&self, path: Vec<PathElement>) -> Result<Option<Entity>> {
        let key = self.make_key(path)?;
        self.get_entity(&key).await
    }

    /// Fetch the children `child_elements` of `ancestor` (or root entities).
    pub async fn get_entities_by_path(
        &self,
        child_elements: Vec<PathElement>,
        ancestor: Option<&Key>,
    ) -> Result<LookupResults> {
        let keys = child_elements
            .into_iter()
            .map(|element| self.child_key(ancestor, element))
            .collect::<Result<Vec<_>>>()?;
        self.get_entities(&keys).await
    }

    pub async fn get_entities_by_name(&self, kind: &str, names: &[&str], ancestor: Option<&Key>) -> Result<LookupResults> {
        let elements = names.iter().map(|name| PathElement::with_name(kind, *name)).collect();
        self.get_entities_by_path(elements, ancestor).await
    }

    pub async fn get_entities_by_id(&self, kind: &str, ids: &[i64], ancestor: Option<&Key>) -> Result<LookupResults> {
        let elements = ids.iter().map(|id| PathElement::with_id(kind, *id)).collect();
        self.get_entities_by_path(elements, ancestor).await
    }

    /// Entities of `kind` under `ancestor`, optionally limited and ordered.
    pub async fn get_entities_by_ancestor(
        &self,
        ancestor: &Key,
        kind: &str,
        limit: Option<u32>,
        order: Option<(&str, Direction)>,
    ) -> Result<Vec<Entity>> {
        let mut builder = QueryBuilder::new(kind).ancestor(ancestor);
        if let Some(limit) = limit.filter(|l| *l > 0) {
            builder = builder.limit(limit);
        }
        if let Some((property, direction)) = order {
            builder = builder.order(property, direction);
        }
        self.run_query(&builder.build()).await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Run `query` in the client's namespace, inside the open transaction if
    /// there is one. Entities are returned in store order.
    pub async fn run_query(&self, query: &QueryDescriptor) -> Result<Vec<Entity>> {
        self.run_query_with(query, self.transactions.transaction_id()).await
    }

    /// Run `query` inside a detached transaction.
    pub async fn run_query_in(&self, transaction: &Transaction, query: &QueryDescriptor) -> Result<Vec<Entity>> {
        self.run_query_with(query, Some(transaction.id())).await
    }

    async fn run_query_with(&self, query: &QueryDescriptor, transaction: Option<&TransactionId>) -> Result<Vec<Entity>> {
        let batch = self
            .connection
            .run_query(query, self.namespace(), transaction)
            .await?;

        let entities = batch
            .entity_result
            .into_iter()
            .filter_map(|result| result.entity)
            .map(|entity| entity_from_proto(entity).map_err(ClientError::from))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            kinds = ?query.kinds,
            results = entities.len(),
            skipped = batch.skipped_results,
            "Query complete"
        );
        Ok(entities)
    }

    /// Fetch only `properties` of the entity at `key`.
    ///
    /// Projection queries can only return indexed properties, so a
    /// projection is issued only if every requested property appears in
    /// `indexed_properties`; otherwise the whole entity is fetched.
    pub async fn get_projected(
        &self,
        key: &Key,
        properties: &[&str],
        indexed_properties: &[&str],
    ) -> Result<Option<Entity>> {
        let projectable = properties.iter().all(|p| indexed_properties.contains(p));
        if !projectable {
            debug!(key = %key, "Unindexed property requested, fetching full entity");
            return self.get_entity(key).await;
        }

        let query = build_key_query(key.kind(), std::slice::from_ref(key), Some(properties))?;
        Ok(self.run_query(&query).await?.into_iter().next())
    }
}

fn require_complete(key: &Key, operation: &str) -> Result<()> {
    if key.is_complete() {
        Ok(())
    } else {
        Err(dstore_core::Error::InvalidPath(format!("{} requires a complete key, got {}", operation, key)).into())
    }
}
