//! In-memory stand-in for the remote store
//!
//! Implements [`Transport`] by decoding each request, applying it to a map of
//! entities and encoding the response. Every call is recorded with the
//! (tokio) time it was made, lookups can be told to defer keys, and failures
//! can be scripted per method.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use dstore_client::{Client, ClientError, Result, Transport};
use dstore_core::wire::{entity_from_proto, entity_to_proto, key_from_proto, key_to_proto, value_from_proto};
use dstore_core::{ClientConfig, Entity, Key, PathBuilder, Property, RetryPolicy, KEY_PROPERTY};
use dstore_proto::{self as proto, Method};
use parking_lot::Mutex;
use prost::Message;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub request: Bytes,
    pub at: Instant,
}

#[derive(Default)]
struct State {
    entities: BTreeMap<String, Entity>,
    next_id: i64,
    next_transaction: u64,
    open_transactions: HashSet<Bytes>,
    deferrals: HashMap<String, usize>,
    failures: HashMap<Method, VecDeque<ClientError>>,
    calls: Vec<Call>,
}

pub struct FakeDatastore {
    state: Mutex<State>,
}

impl FakeDatastore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        })
    }

    /// Store `entity` directly, bypassing the client.
    pub fn insert(&self, entity: Entity) {
        self.state.lock().entities.insert(entity.key().encode().into_string(), entity);
    }

    pub fn get(&self, key: &Key) -> Option<Entity> {
        self.state.lock().entities.get(key.encode().as_str()).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entities.len()
    }

    /// Report `key` as deferred for the next `times` lookups that request it.
    pub fn defer(&self, key: &Key, times: usize) {
        self.state.lock().deferrals.insert(key.encode().into_string(), times);
    }

    /// Fail the next call to `method` with `error`. Calls queue up.
    pub fn fail_next(&self, method: Method, error: ClientError) {
        self.state.lock().failures.entry(method).or_default().push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn methods(&self) -> Vec<Method> {
        self.state.lock().calls.iter().map(|c| c.method).collect()
    }

    pub fn calls_to(&self, method: Method) -> Vec<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Decoded requests sent to `method`, in call order.
    pub fn requests<M: Message + Default>(&self, method: Method) -> Vec<M> {
        self.calls_to(method)
            .into_iter()
            .map(|c| M::decode(c.request).expect("request decodes"))
            .collect()
    }

    pub fn open_transactions(&self) -> usize {
        self.state.lock().open_transactions.len()
    }

    fn handle(&self, method: Method, request: Bytes) -> Result<Bytes> {
        let mut state = self.state.lock();
        state.calls.push(Call {
            method,
            request: request.clone(),
            at: Instant::now(),
        });

        if let Some(error) = state.failures.get_mut(&method).and_then(VecDeque::pop_front) {
            return Err(error);
        }

        let response = match method {
            Method::Lookup => state.lookup(decode(request)?).encode_to_vec(),
            Method::RunQuery => state.run_query(decode(request)?).encode_to_vec(),
            Method::BeginTransaction => state.begin().encode_to_vec(),
            Method::Commit => state.commit(decode(request)?)?.encode_to_vec(),
            Method::Rollback => state.rollback(decode(request)?)?.encode_to_vec(),
            Method::BlindWrite => {
                let request: proto::BlindWriteRequest = decode(request)?;
                proto::BlindWriteResponse {
                    mutation_result: Some(state.apply(request.mutation.unwrap_or_default())),
                }
                .encode_to_vec()
            }
            Method::AllocateIds => state.allocate_ids(decode(request)?).encode_to_vec(),
        };
        Ok(Bytes::from(response))
    }
}

#[async_trait]
impl Transport for FakeDatastore {
    async fn call(&self, method: Method, request: Bytes) -> Result<Bytes> {
        self.handle(method, request)
    }
}

fn decode<M: Message + Default>(request: Bytes) -> Result<M> {
    M::decode(request).map_err(|e| ClientError::InvalidArgument(e.to_string()))
}

fn encoded(key: &proto::Key) -> String {
    key_from_proto(key.clone()).expect("valid key").encode().into_string()
}

impl State {
    fn lookup(&mut self, request: proto::LookupRequest) -> proto::LookupResponse {
        let mut response = proto::LookupResponse::default();
        for key in request.key {
            let id = encoded(&key);
            if let Some(remaining) = self.deferrals.get_mut(&id).filter(|n| **n > 0) {
                *remaining -= 1;
                response.deferred.push(key);
                continue;
            }
            match self.entities.get(&id) {
                Some(entity) => response.found.push(proto::EntityResult {
                    entity: Some(entity_to_proto(entity)),
                }),
                None => response.missing.push(proto::EntityResult {
                    entity: Some(proto::Entity {
                        key: Some(key),
                        property: Vec::new(),
                    }),
                }),
            }
        }
        response
    }

    fn run_query(&self, request: proto::RunQueryRequest) -> proto::RunQueryResponse {
        let query = request.query.unwrap_or_default();
        let namespace = request.partition_id.and_then(|p| p.namespace);
        let projection: Vec<String> = query
            .projection
            .iter()
            .filter_map(|p| p.property.as_ref().map(|r| r.name.clone()))
            .collect();

        let matching: Vec<&Entity> = self
            .entities
            .values()
            .filter(|e| e.key().namespace().map(str::to_string) == namespace)
            .filter(|e| query.kind.is_empty() || query.kind.iter().any(|k| k.name == e.key().kind()))
            .filter(|e| query.filter.as_ref().map_or(true, |f| matches(f, e)))
            .collect();

        let skipped = matching.len().min(query.offset as usize);
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);

        let entity_result = matching
            .into_iter()
            .skip(skipped)
            .take(limit)
            .map(|entity| {
                let projected = project(entity, &projection);
                proto::EntityResult {
                    entity: Some(entity_to_proto(&projected)),
                }
            })
            .collect();

        proto::RunQueryResponse {
            batch: Some(proto::QueryResultBatch {
                entity_result,
                end_cursor: None,
                more_results: proto::query_result_batch::MoreResultsType::NoMoreResults as i32,
                skipped_results: skipped as i32,
            }),
        }
    }

    fn begin(&mut self) -> proto::BeginTransactionResponse {
        self.next_transaction += 1;
        let handle = Bytes::from(format!("tx-{}", self.next_transaction));
        self.open_transactions.insert(handle.clone());
        proto::BeginTransactionResponse { transaction: handle }
    }

    fn close(&mut self, handle: &Bytes) -> Result<()> {
        if self.open_transactions.remove(handle) {
            Ok(())
        } else {
            Err(ClientError::InvalidArgument("unknown transaction".to_string()))
        }
    }

    fn commit(&mut self, request: proto::CommitRequest) -> Result<proto::CommitResponse> {
        self.close(&request.transaction)?;
        Ok(proto::CommitResponse {
            mutation_result: Some(self.apply(request.mutation.unwrap_or_default())),
        })
    }

    fn rollback(&mut self, request: proto::RollbackRequest) -> Result<proto::RollbackResponse> {
        self.close(&request.transaction)?;
        Ok(proto::RollbackResponse {})
    }

    fn complete(&mut self, key: Key) -> Key {
        if key.is_complete() {
            return key;
        }
        self.next_id += 1;
        key.with_id(self.next_id)
    }

    fn apply(&mut self, mutation: proto::Mutation) -> proto::MutationResult {
        use proto::mutation_operation::Operation;

        let mut result = proto::MutationResult::default();
        for op in mutation.operation {
            match op.operation.expect("operation set") {
                Operation::Upsert(entity) => {
                    let entity = entity_from_proto(entity).expect("valid entity");
                    self.entities.insert(entity.key().encode().into_string(), entity);
                }
                Operation::InsertAutoId(entity) => {
                    let entity = entity_from_proto(entity).expect("valid entity");
                    let key = self.complete(entity.key().clone());
                    result.insert_auto_id_key.push(key_to_proto(&key));
                    self.entities.insert(key.encode().into_string(), entity.with_key(key));
                }
                Operation::Delete(key) => {
                    self.entities.remove(&encoded(&key));
                }
            }
            result.index_updates += 1;
        }
        result
    }

    fn allocate_ids(&mut self, request: proto::AllocateIdsRequest) -> proto::AllocateIdsResponse {
        let key = request
            .key
            .into_iter()
            .map(|k| {
                let key = self.complete(key_from_proto(k).expect("valid key"));
                key_to_proto(&key)
            })
            .collect();
        proto::AllocateIdsResponse { key }
    }
}

fn matches(filter: &proto::Filter, entity: &Entity) -> bool {
    use proto::composite_filter::Operator as Composite;
    use proto::property_filter::Operator;

    if let Some(composite) = &filter.composite_filter {
        let mut results = composite.filter.iter().map(|f| matches(f, entity));
        return match Composite::try_from(composite.operator) {
            Ok(Composite::Or) => results.any(|r| r),
            _ => results.all(|r| r),
        };
    }

    let Some(pf) = &filter.property_filter else {
        return true;
    };
    let name = pf.property.as_ref().map(|p| p.name.as_str()).unwrap_or_default();
    let Some(value) = pf.value.clone().and_then(|v| value_from_proto(v).ok()) else {
        return false;
    };

    match Operator::try_from(pf.operator) {
        Ok(Operator::HasAncestor) => value
            .as_key()
            .map_or(false, |ancestor| ancestor.is_ancestor_of(entity.key())),
        Ok(Operator::Equal) if name == KEY_PROPERTY => value.as_key() == Some(entity.key()),
        Ok(Operator::Equal) => entity
            .property(name)
            .map_or(false, |p| p.is_indexed() && p.values().contains(&value)),
        _ => false,
    }
}

fn project(entity: &Entity, projection: &[String]) -> Entity {
    if projection.is_empty() {
        return entity.clone();
    }
    let mut projected = Entity::new(entity.key().clone());
    for name in projection.iter().filter(|n| n.as_str() != KEY_PROPERTY) {
        if let Some(property) = entity.property(name) {
            projected.set(property.clone());
        }
    }
    projected
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn config() -> ClientConfig {
    ClientConfig::new("test-dataset")
}

/// Client over `fake` with the default retry policies.
pub fn client(fake: &Arc<FakeDatastore>) -> Client {
    client_with(fake, config())
}

pub fn client_with(fake: &Arc<FakeDatastore>, config: ClientConfig) -> Client {
    Client::with_transport(config, fake.clone()).expect("valid config")
}

/// Client whose lookups retry at most `retries` times.
pub fn client_with_lookup_budget(fake: &Arc<FakeDatastore>, retries: u32) -> Client {
    client_with(fake, config().with_lookup_retry(RetryPolicy::new(retries, 2000)))
}

pub fn user_key(name: &str) -> Key {
    PathBuilder::new().name("User", name).build().unwrap()
}

pub fn user(name: &str, city: &str) -> Entity {
    Entity::new(user_key(name))
        .with_property(Property::indexed("city", city))
        .with_property(Property::new("bio", format!("{} from {}", name, city)))
}
