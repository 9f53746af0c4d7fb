//! Reconciling seeder scenarios against the in-memory store.
//!
//! Run with: cargo test -p hoby-loop-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::path::PathBuf;

use hoby_loop_api::seed::{
    MemorySeedStore, SeedBatch, SeedError, SeedTable, seed_batch, seed_from_file,
};
use hoby_loop_core::{BasketId, SubscriptionId, UserId};
use hoby_loop_integration_tests::{basket, consumer, marketplace_batch, seller, subscription};

fn bundled_seed_file() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/seed.json")
}

// ============================================================================
// Idempotence
// ============================================================================

#[tokio::test]
async fn test_first_run_inserts_everything() {
    let store = MemorySeedStore::new();

    let report = seed_batch(&store, &marketplace_batch()).await.unwrap();

    assert_eq!(report.users.inserted, 3);
    assert_eq!(report.baskets.inserted, 2);
    assert_eq!(report.subscriptions.inserted, 3);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[tokio::test]
async fn test_second_run_updates_in_place() {
    let store = MemorySeedStore::new();
    let batch = marketplace_batch();

    seed_batch(&store, &batch).await.unwrap();
    let report = seed_batch(&store, &batch).await.unwrap();

    assert_eq!(report.users.inserted, 0);
    assert_eq!(report.users.updated, 3);
    assert_eq!(report.baskets.updated, 2);
    assert_eq!(report.subscriptions.updated, 3);
    assert_eq!(store.user_count().await, 3);
    assert_eq!(store.basket_count().await, 2);
    assert_eq!(store.subscription_count().await, 3);
}

#[tokio::test]
async fn test_changed_fields_overwrite_the_same_row() {
    let store = MemorySeedStore::new();
    seed_batch(&store, &marketplace_batch()).await.unwrap();

    let mut batch = marketplace_batch();
    batch.users[1].name = "Bruno Souza".to_owned();
    batch.baskets[0].name = "Cesta Orgânica Grande".to_owned();
    seed_batch(&store, &batch).await.unwrap();

    assert_eq!(store.user_count().await, 3);
    let bruno = store.user(UserId::new(2)).await.unwrap();
    assert_eq!(bruno.name, "Bruno Souza");
    let cesta = store.basket(BasketId::new(1)).await.unwrap();
    assert_eq!(cesta.name, "Cesta Orgânica Grande");
}

// ============================================================================
// Identity Resolution
// ============================================================================

#[tokio::test]
async fn test_email_match_keeps_stored_id() {
    let store = MemorySeedStore::new();
    seed_batch(
        &store,
        &SeedBatch {
            users: vec![consumer(1, "bruno@example.com", "Bruno")],
            ..SeedBatch::default()
        },
    )
    .await
    .unwrap();

    let batch = SeedBatch {
        users: vec![consumer(5, "bruno@example.com", "Bruno S.")],
        ..SeedBatch::default()
    };
    let report = seed_batch(&store, &batch).await.unwrap();

    assert_eq!(report.users.matched_by_email, 1);
    assert_eq!(store.user_count().await, 1);
    assert!(store.user(UserId::new(5)).await.is_none());
    assert_eq!(store.user(UserId::new(1)).await.unwrap().name, "Bruno S.");
}

#[tokio::test]
async fn test_id_match_overwrites_email() {
    let store = MemorySeedStore::new();
    seed_batch(
        &store,
        &SeedBatch {
            users: vec![seller(1, "old@hoby.com.br", "Horta")],
            ..SeedBatch::default()
        },
    )
    .await
    .unwrap();

    let batch = SeedBatch {
        users: vec![seller(1, "new@hoby.com.br", "Horta")],
        ..SeedBatch::default()
    };
    seed_batch(&store, &batch).await.unwrap();

    assert!(store.user_by_email("old@hoby.com.br").await.is_none());
    assert_eq!(
        store.user_by_email("new@hoby.com.br").await.unwrap().id,
        UserId::new(1)
    );
}

#[tokio::test]
async fn test_references_follow_remapped_users() {
    let store = MemorySeedStore::new();
    seed_batch(
        &store,
        &SeedBatch {
            users: vec![
                seller(1, "horta@hoby.com.br", "Horta"),
                consumer(2, "bruno@example.com", "Bruno"),
            ],
            ..SeedBatch::default()
        },
    )
    .await
    .unwrap();

    // Both people renumbered; every reference must land on the stored rows.
    let batch = SeedBatch {
        users: vec![
            seller(10, "horta@hoby.com.br", "Horta"),
            consumer(20, "bruno@example.com", "Bruno"),
        ],
        baskets: vec![basket(1, 10, 4990)],
        subscriptions: vec![subscription(1, 20, 1)],
    };
    seed_batch(&store, &batch).await.unwrap();

    assert_eq!(
        store.basket(BasketId::new(1)).await.unwrap().seller_id,
        UserId::new(1)
    );
    let stored = store.subscription(SubscriptionId::new(1)).await.unwrap();
    assert_eq!(stored.user_id, UserId::new(2));
    assert_eq!(stored.basket_id, BasketId::new(1));
}

// ============================================================================
// Atomicity
// ============================================================================

#[tokio::test]
async fn test_missing_reference_rolls_back_whole_batch() {
    let store = MemorySeedStore::new();
    let batch = SeedBatch {
        users: vec![seller(1, "horta@hoby.com.br", "Horta")],
        baskets: vec![basket(1, 1, 4990), basket(2, 99, 4990)],
        ..SeedBatch::default()
    };

    let err = seed_batch(&store, &batch).await.unwrap_err();

    assert!(matches!(err, SeedError::Record { ref record, .. } if record.starts_with("basket 2")));
    assert_eq!(store.user_count().await, 0);
    assert_eq!(store.basket_count().await, 0);
}

#[tokio::test]
async fn test_failed_run_leaves_previous_state() {
    let store = MemorySeedStore::new();
    seed_batch(&store, &marketplace_batch()).await.unwrap();

    let mut batch = marketplace_batch();
    batch.users[0].name = "Renamed".to_owned();
    batch.subscriptions.push(subscription(9, 2, 77));
    assert!(seed_batch(&store, &batch).await.is_err());

    assert_eq!(
        store.user(UserId::new(1)).await.unwrap().name,
        "Horta da Ana"
    );
    assert!(store.subscription(SubscriptionId::new(9)).await.is_none());
}

#[tokio::test]
async fn test_lookup_error_rolls_back_whole_batch() {
    let store = MemorySeedStore::new();
    seed_batch(&store, &marketplace_batch()).await.unwrap();
    store.fail_lookup(SeedTable::Baskets).await;

    let mut batch = marketplace_batch();
    batch.users[0].name = "Renamed".to_owned();
    batch.users.push(consumer(4, "dora@example.com", "Dora"));
    let err = seed_batch(&store, &batch).await.unwrap_err();

    assert!(matches!(err, SeedError::Record { ref record, .. } if record.starts_with("basket 1")));
    assert_eq!(
        store.user(UserId::new(1)).await.unwrap().name,
        "Horta da Ana"
    );
    assert!(store.user(UserId::new(4)).await.is_none());
    assert_eq!(store.user_count().await, 3);
}

#[tokio::test]
async fn test_duplicate_emails_rejected_before_writing() {
    let store = MemorySeedStore::new();
    let batch = SeedBatch {
        users: vec![
            consumer(1, "bruno@example.com", "Bruno"),
            consumer(2, "bruno@example.com", "Outro Bruno"),
        ],
        ..SeedBatch::default()
    };

    let err = seed_batch(&store, &batch).await.unwrap_err();

    assert!(matches!(err, SeedError::Invalid(_)));
    assert_eq!(store.user_count().await, 0);
}

// ============================================================================
// Sequences
// ============================================================================

#[tokio::test]
async fn test_sequences_move_past_seeded_ids() {
    let store = MemorySeedStore::new();
    let batch = SeedBatch {
        users: vec![
            seller(3, "horta@hoby.com.br", "Horta"),
            consumer(41, "bruno@example.com", "Bruno"),
        ],
        baskets: vec![basket(17, 3, 4990)],
        subscriptions: vec![subscription(8, 41, 17)],
    };

    seed_batch(&store, &batch).await.unwrap();

    assert_eq!(store.next_sequence_value(SeedTable::Users).await, 42);
    assert_eq!(store.next_sequence_value(SeedTable::Baskets).await, 18);
    assert_eq!(store.next_sequence_value(SeedTable::Subscriptions).await, 9);
}

#[tokio::test]
async fn test_reassigned_id_skips_past_stored_rows() {
    let store = MemorySeedStore::new();
    store.reserve_id(SeedTable::Users, 2).await;

    let batch = SeedBatch {
        users: vec![
            seller(5, "horta@hoby.com.br", "Horta"),
            consumer(2, "bruno@example.com", "Bruno"),
        ],
        ..SeedBatch::default()
    };
    let report = seed_batch(&store, &batch).await.unwrap();

    assert_eq!(report.users.reassigned, 1);
    let bruno = store.user_by_email("bruno@example.com").await.unwrap();
    assert_eq!(bruno.id, UserId::new(6));
}

// ============================================================================
// Seed Files
// ============================================================================

#[tokio::test]
async fn test_bundled_seed_file_loads_cleanly() {
    let store = MemorySeedStore::new();

    let report = seed_from_file(&store, bundled_seed_file()).await.unwrap();

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(store.user_count().await, 6);
    assert_eq!(store.basket_count().await, 3);
    assert_eq!(store.subscription_count().await, 4);

    let again = seed_from_file(&store, bundled_seed_file()).await.unwrap();
    assert_eq!(again.users.inserted, 0);
    assert_eq!(store.user_count().await, 6);
}

#[tokio::test]
async fn test_yaml_seed_file() {
    let path = std::env::temp_dir().join(format!("hoby-seed-{}.yaml", std::process::id()));
    tokio::fs::write(
        &path,
        "users:\n  - id: 1\n    role: seller\n    name: Horta\n    email: horta@hoby.com.br\n    password: x\n    cnpj: 11.222.333/0001-81\n",
    )
    .await
    .unwrap();

    let store = MemorySeedStore::new();
    let report = seed_from_file(&store, &path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    assert_eq!(report.users.inserted, 1);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[tokio::test]
async fn test_missing_seed_file() {
    let store = MemorySeedStore::new();

    let err = seed_from_file(&store, "does/not/exist.json").await.unwrap_err();

    assert!(matches!(err, SeedError::Io { .. }));
}
