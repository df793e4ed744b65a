/// Transaction state machine against the in-memory store
mod common;

use common::{client, user, user_key, FakeDatastore};
use dstore_client::{ClientError, Method};
use dstore_core::{Entity, Key, Property};
use dstore_proto as proto;

#[tokio::test]
async fn test_begin_twice_fails() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    let first = client.begin_transaction().await.unwrap();
    let err = client.begin_transaction().await.unwrap_err();

    assert!(matches!(err, ClientError::AlreadyInTransaction));
    assert!(client.in_transaction());
    assert_eq!(client.transaction_id(), Some(&first));
    assert_eq!(fake.calls_to(Method::BeginTransaction).len(), 1);
}

#[tokio::test]
async fn test_commit_without_transaction_fails() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    let err = client.commit().await.unwrap_err();
    assert!(matches!(err, ClientError::NotInTransaction));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_rollback_without_transaction_is_noop() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    assert!(!client.rollback().await.unwrap());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_commit_then_read() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    client.begin_transaction().await.unwrap();
    client.write_entity(user("alice", "Paris")).await.unwrap();
    client.write_entity(user("bob", "Oslo")).await.unwrap();

    // Buffered only: no write reached the store yet
    assert_eq!(fake.len(), 0);
    assert!(fake.calls_to(Method::BlindWrite).is_empty());

    let generated = client.commit().await.unwrap();
    assert!(generated.is_empty());
    assert!(!client.in_transaction());

    let alice = client.get_entity(&user_key("alice")).await.unwrap().unwrap();
    assert_eq!(alice.get("city").and_then(|v| v.as_str()), Some("Paris"));
    assert_eq!(fake.len(), 2);

    let commits: Vec<proto::CommitRequest> = fake.requests(Method::Commit);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].mutation.as_ref().unwrap().operation.len(), 2);
}

#[tokio::test]
async fn test_rollback_discards_buffered_writes() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    client.begin_transaction().await.unwrap();
    client.write_entity(user("alice", "Paris")).await.unwrap();
    client.delete(user_key("bob")).await.unwrap();

    assert!(client.rollback().await.unwrap());
    assert!(!client.in_transaction());
    assert_eq!(fake.len(), 0);
    assert_eq!(fake.open_transactions(), 0);
    assert_eq!(
        fake.methods(),
        vec![Method::BeginTransaction, Method::Rollback]
    );
}

#[tokio::test]
async fn test_failed_commit_leaves_client_idle() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    client.begin_transaction().await.unwrap();
    client.write_entity(user("alice", "Paris")).await.unwrap();
    fake.fail_next(Method::Commit, ClientError::TransactionAborted("contention".into()));

    let err = client.commit().await.unwrap_err();
    match err {
        ClientError::RemoteMutation { operation, source } => {
            assert_eq!(operation, Method::Commit);
            assert!(matches!(*source, ClientError::TransactionAborted(_)));
        }
        other => panic!("expected RemoteMutation, got {:?}", other),
    }

    assert!(!client.in_transaction());
    assert!(matches!(client.commit().await, Err(ClientError::NotInTransaction)));
    // a fresh transaction can be started straight away
    client.begin_transaction().await.unwrap();
}

#[tokio::test]
async fn test_reads_carry_transaction_handle() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    client.get_entity(&user_key("alice")).await.unwrap();
    let tx = client.begin_transaction().await.unwrap();
    client.get_entity(&user_key("alice")).await.unwrap();

    let lookups: Vec<proto::LookupRequest> = fake.requests(Method::Lookup);
    assert_eq!(lookups.len(), 2);
    assert!(lookups[0].read_options.is_none());
    assert_eq!(
        lookups[1].read_options.as_ref().unwrap().transaction.as_ref(),
        Some(tx.as_bytes())
    );
}

#[tokio::test]
async fn test_insert_auto_id_inside_transaction() {
    let fake = FakeDatastore::new();
    let mut client = client(&fake);

    client.begin_transaction().await.unwrap();
    let incomplete = Key::incomplete("Post", None).unwrap();
    let buffered = client
        .insert_auto_id_multi(
            vec![
                Entity::new(incomplete.clone()).with_property(Property::new("title", "one")),
                Entity::new(incomplete).with_property(Property::new("title", "two")),
            ],
            true,
        )
        .await
        .unwrap();
    assert_eq!(buffered, None);

    let keys = client.commit().await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(Key::is_complete));
    assert_ne!(keys[0], keys[1]);

    let stored = fake.get(&keys[1]).unwrap();
    assert_eq!(stored.get("title").and_then(|v| v.as_str()), Some("two"));
}

#[tokio::test]
async fn test_detached_transaction() {
    let fake = FakeDatastore::new();
    fake.insert(user("alice", "Paris"));
    let client = client(&fake);

    let mut tx = client.new_transaction().await.unwrap();
    assert!(!client.in_transaction());

    let current = client.get_entities_in(&tx, &[user_key("alice")]).await.unwrap();
    let alice = current[&user_key("alice").encode()].clone().unwrap();

    tx.upsert(alice.with_property(Property::indexed("city", "Rome"))).unwrap();
    tx.insert_auto_id(Entity::new(Key::incomplete("Audit", None).unwrap()))
        .unwrap();
    assert_eq!(tx.pending(), 2);

    let keys = client.commit_transaction(tx).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].kind(), "Audit");

    let stored = fake.get(&user_key("alice")).unwrap();
    assert_eq!(stored.get("city").and_then(|v| v.as_str()), Some("Rome"));

    let lookup: Vec<proto::LookupRequest> = fake.requests(Method::Lookup);
    assert!(lookup[0].read_options.as_ref().unwrap().transaction.is_some());
}

#[tokio::test]
async fn test_detached_rollback() {
    let fake = FakeDatastore::new();
    let client = client(&fake);

    let mut tx = client.new_transaction().await.unwrap();
    tx.delete(user_key("alice")).unwrap();
    client.rollback_transaction(tx).await.unwrap();

    assert_eq!(fake.open_transactions(), 0);
    assert!(fake.calls_to(Method::Commit).is_empty());
}
