//! Cache hierarchy tests: tier interplay, fire-and-forget writes, and
//! precise invalidation across L1/L2/L3.

#[path = "testutils/mod.rs"]
mod testutils;

use metriclite::cache::{CacheFingerprint, EntryKind};
use metriclite::exec::{QueryStatus, Value};
use metriclite::metadata::{AggFunc, MemoryMetadataProvider, MetricDefinition};
use metriclite::storage::SharedKeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use testutils::{init_logging, request, row, ScriptedEngine, TestFixture};

fn fingerprint(metrics: &[&str], time_points: &[&str]) -> CacheFingerprint {
    CacheFingerprint::new(
        &metrics.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        &time_points.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        &[],
        false,
        EntryKind::QueryResult,
    )
}

/// Wait for a fire-and-forget shared-store write to land.
async fn await_shared_entry(kv: &dyn SharedKeyValueStore, key: &str) -> bool {
    for _ in 0..100 {
        if kv.get(key).await.ok().flatten().is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn query_results_populate_both_result_tiers() {
    init_logging();
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01")),
    );
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD1001",
        Value::Number(5.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);
    fixture.seed_partition("KD1001", "20251201", "C01");

    let response = fixture
        .coordinator
        .process_query(&request(&["KD1001"], &["20251201"]))
        .await;
    assert_eq!(response.status, QueryStatus::Success, "{}", response.message);

    // L1 immediately.
    assert_eq!(fixture.cache.local_stats().entries, 1);
    // L2 eventually; the write is detached from the request path.
    let key = fingerprint(&["KD1001"], &["20251201"]).canonical();
    assert!(
        await_shared_entry(fixture.kv.as_ref(), &key).await,
        "shared cache never received the write"
    );
}

#[tokio::test]
async fn shared_tier_hit_refills_the_local_tier() {
    init_logging();
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01")),
    );
    let rows = vec![row(&[("KD1001", Value::Number(5.0))])];
    let fingerprint = fingerprint(&["KD1001"], &["20251201"]);

    let engine = Arc::new(ScriptedEngine::returning(rows.clone()));
    let fixture = TestFixture::new(metadata, engine);

    // Seed L2 directly, bypassing L1.
    fixture
        .kv
        .set_with_ttl(
            &fingerprint.canonical(),
            bincode::serialize(&rows).expect("encodable rows"),
            60,
        )
        .await
        .expect("seed shared store");

    let hit = fixture.cache.get(&fingerprint).await;
    assert_eq!(hit, Some(rows));
    assert_eq!(fixture.cache.local_stats().entries, 1, "L1 not refilled");
}

#[tokio::test]
async fn invalidation_removes_exactly_the_mentioned_coordinates() {
    init_logging();
    let metadata = Arc::new(MemoryMetadataProvider::new());
    let engine = Arc::new(ScriptedEngine::returning(Vec::new()));
    let fixture = TestFixture::new(metadata, engine);

    let rows = vec![row(&[("KD1001", Value::Number(1.0))])];
    let both = fingerprint(&["KD1001"], &["20251201"]);
    let other_time = fingerprint(&["KD1001"], &["20251202"]);
    let other_metric = fingerprint(&["KD2002"], &["20251201"]);
    let multi = fingerprint(&["KD1001", "KD2002"], &["20251201", "20251203"]);
    for entry in [&both, &other_time, &other_metric, &multi] {
        fixture.cache.put(entry, rows.clone());
    }
    for entry in [&both, &other_time, &other_metric, &multi] {
        assert!(await_shared_entry(fixture.kv.as_ref(), &entry.canonical()).await);
    }

    fixture.cache.invalidate("KD1001", "20251201").await;

    // Mentioning both coordinates: evicted from L1 and L2.
    assert!(fixture.cache.get(&both).await.is_none());
    assert!(fixture.kv.get(&both.canonical()).await.unwrap().is_none());
    assert!(fixture.kv.get(&multi.canonical()).await.unwrap().is_none());
    // Mentioning only one coordinate: untouched.
    assert!(fixture.cache.get(&other_time).await.is_some());
    assert!(fixture.cache.get(&other_metric).await.is_some());
}

#[tokio::test]
async fn empty_shared_tier_never_fails_the_query() {
    init_logging();
    // A hierarchy whose shared tier holds nothing still answers; L2
    // misses and failures are logged and never fail the query.
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01")),
    );
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD1001",
        Value::Number(5.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);
    fixture.seed_partition("KD1001", "20251201", "C01");

    let response = fixture
        .coordinator
        .process_query(&request(&["KD1001"], &["20251201"]))
        .await;
    assert_eq!(response.status, QueryStatus::Success);
}
