//! PostgreSQL store tests
//!
//! These need a reachable server. Run with:
//! ```bash
//! DATABASE_URL=postgres://localhost/sf311_test cargo test -p sf311-ingest --test postgres_store_tests -- --ignored
//! ```

mod common;

use common::ts;
use sf311_ingest::{BatchUpserter, PgRequestStore, Request, RequestStore};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_empty_table_has_no_maximum(pool: PgPool) {
    let store = PgRequestStore::new(pool);
    assert_eq!(store.max_created_at().await.unwrap(), None);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_upsert_then_update_keeps_one_row(pool: PgPool) {
    let store = PgRequestStore::new(pool);
    let opened = ts("2024-05-01T08:00:00Z");

    store
        .upsert_batch(&[Request::new("9", opened).with_status("Open")])
        .await
        .unwrap();
    store
        .upsert_batch(&[Request::new("9", opened).with_status("Closed")])
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    let row = store.get("9").await.unwrap().unwrap();
    assert_eq!(row.status.as_deref(), Some("Closed"));
    assert_eq!(row.raw, serde_json::json!({}));
    assert_eq!(store.max_created_at().await.unwrap(), Some(opened));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_repeated_id_in_one_batch_collapses(pool: PgPool) {
    let store = PgRequestStore::new(pool);
    let opened = ts("2024-05-01T08:00:00Z");
    let batch = [
        Request::new("9", opened).with_status("Open"),
        Request::new("9", opened).with_status("Closed"),
    ];

    let written = BatchUpserter::new(&store).upsert(&batch).await.unwrap();

    assert_eq!(written, 1);
    assert_eq!(store.count().await.unwrap(), 1);
    let row = store.get("9").await.unwrap().unwrap();
    assert_eq!(row.status.as_deref(), Some("Closed"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_many_batches_land(pool: PgPool) {
    let store = PgRequestStore::new(pool);
    let requests: Vec<_> = (0..1_500)
        .map(|i| {
            Request::new(i.to_string(), ts("2024-01-01T00:00:00Z") + chrono::Duration::seconds(i))
                .with_category("Graffiti")
        })
        .collect();

    let written = BatchUpserter::new(&store)
        .with_batch_size(400)
        .upsert(&requests)
        .await
        .unwrap();

    assert_eq!(written, 1_500);
    assert_eq!(store.count().await.unwrap(), 1_500);
    assert_eq!(
        store.max_created_at().await.unwrap(),
        Some(ts("2024-01-01T00:24:59Z"))
    );
}
