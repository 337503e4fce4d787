//! End-to-end query flow tests: resolution, generation, execution and
//! per-time-point concatenation through the coordinator.

#[path = "testutils/mod.rs"]
mod testutils;

use metriclite::exec::{QueryStatus, Value};
use metriclite::metadata::{AggFunc, MemoryMetadataProvider, MetricDefinition};
use std::sync::Arc;
use testutils::{init_logging, request, row, ScriptedEngine, TestFixture};

#[tokio::test]
async fn physical_metric_across_two_time_points() {
    init_logging();
    log::debug!("🧪 Testing a physical metric over two time points");
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01")),
    );
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD1001",
        Value::Number(42.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);
    fixture.seed_partition("KD1001", "20251201", "C01");
    fixture.seed_partition("KD1001", "20251202", "C01");

    let response = fixture
        .coordinator
        .process_query(&request(&["KD1001"], &["20251201", "20251202"]))
        .await;

    assert_eq!(response.status, QueryStatus::Success, "{}", response.message);
    // One single-table statement per time point.
    assert_eq!(fixture.engine.statement_count(), 2);
    assert_eq!(fixture.engine.attach_count(), 2);
    for statement in fixture.engine.statements.lock().iter() {
        assert!(!statement.contains("UNION ALL"));
    }
    // Rows from both time points, each tagged with its own.
    assert_eq!(response.result.rows.len(), 2);
    let tags: Vec<&str> = response
        .result
        .rows
        .iter()
        .filter_map(|r| r.get("time_point").and_then(Value::as_str))
        .collect();
    assert_eq!(tags, ["20251201", "20251202"]);
    for r in &response.result.rows {
        assert_eq!(r.get("KD1001").and_then(Value::as_f64), Some(42.0));
    }
}

#[tokio::test]
async fn composite_with_last_year_pulls_both_periods() {
    init_logging();
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01"))
            .with_metric(MetricDefinition::composite(
                "KD9001",
                "${KD1001}+${KD1001.lastYear}",
                AggFunc::Sum,
            )),
    );
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD9001",
        Value::Number(7.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);
    fixture.seed_partition("KD1001", "20251201", "C01");
    fixture.seed_partition("KD1001", "20241201", "C01");

    let response = fixture
        .coordinator
        .process_query(&request(&["KD9001"], &["20251201"]))
        .await;

    assert_eq!(response.status, QueryStatus::Success, "{}", response.message);
    // Two partitions of KD1001: current and one year back.
    assert_eq!(fixture.engine.attach_count(), 2);
    let statements = fixture.engine.statements.lock();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("time_point = '20251201'"));
    assert!(statements[0].contains("time_point = '20241201'"));
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    init_logging();
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01")),
    );
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD1001",
        Value::Number(1.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);
    fixture.seed_partition("KD1001", "20251201", "C01");

    let first = fixture
        .coordinator
        .process_query(&request(&["KD1001"], &["20251201"]))
        .await;
    assert_eq!(first.status, QueryStatus::Success, "{}", first.message);
    assert_eq!(fixture.engine.statement_count(), 1);

    // Same logical query with nothing reordered; must not hit the engine.
    let second = fixture
        .coordinator
        .process_query(&request(&["KD1001"], &["20251201"]))
        .await;
    assert_eq!(second.status, QueryStatus::Success);
    assert_eq!(fixture.engine.statement_count(), 1);
    assert_eq!(second.result.rows.len(), first.result.rows.len());
}

#[tokio::test]
async fn reordered_inputs_collide_to_the_same_cache_entry() {
    init_logging();
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01"))
            .with_metric(MetricDefinition::physical("KD1002", AggFunc::Sum, "C01")),
    );
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD1001",
        Value::Number(1.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);
    for metric in ["KD1001", "KD1002"] {
        for time_point in ["20251201", "20251202"] {
            fixture.seed_partition(metric, time_point, "C01");
        }
    }

    let first = fixture
        .coordinator
        .process_query(&request(&["KD1001", "KD1002"], &["20251201", "20251202"]))
        .await;
    assert_eq!(first.status, QueryStatus::Success, "{}", first.message);
    let statements_after_first = fixture.engine.statement_count();

    let second = fixture
        .coordinator
        .process_query(&request(&["KD1002", "KD1001"], &["20251202", "20251201"]))
        .await;
    assert_eq!(second.status, QueryStatus::Success);
    assert_eq!(fixture.engine.statement_count(), statements_after_first);
}

#[tokio::test]
async fn unknown_metric_fails_the_whole_query() {
    init_logging();
    let metadata = Arc::new(MemoryMetadataProvider::new());
    let engine = Arc::new(ScriptedEngine::returning(Vec::new()));
    let fixture = TestFixture::new(metadata, engine);

    let response = fixture
        .coordinator
        .process_query(&request(&["KD_NOPE"], &["20251201"]))
        .await;

    assert_eq!(response.status, QueryStatus::Failed);
    assert!(response.message.contains("KD_NOPE"));
    assert!(response.result.rows.is_empty());
}

#[tokio::test]
async fn circular_formula_fails_the_whole_query() {
    init_logging();
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::derived("KD_A", "${KD_B}", AggFunc::Sum))
            .with_metric(MetricDefinition::derived("KD_B", "${KD_A}", AggFunc::Sum)),
    );
    let engine = Arc::new(ScriptedEngine::returning(Vec::new()));
    let fixture = TestFixture::new(metadata, engine);

    let response = fixture
        .coordinator
        .process_query(&request(&["KD_A"], &["20251201"]))
        .await;

    assert_eq!(response.status, QueryStatus::Failed);
    assert!(response.message.contains("Circular dependency"));
}

#[tokio::test]
async fn missing_partition_fails_only_its_time_point_but_surfaces() {
    init_logging();
    let metadata = Arc::new(
        MemoryMetadataProvider::new()
            .with_metric(MetricDefinition::physical("KD1001", AggFunc::Sum, "C01")),
    );
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD1001",
        Value::Number(1.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);
    // Only the first time point's partition exists.
    fixture.seed_partition("KD1001", "20251201", "C01");

    let response = fixture
        .coordinator
        .process_query(&request(&["KD1001"], &["20251201", "20251202"]))
        .await;

    // The healthy time point still executed, but the overall query
    // surfaces the failure rather than silently dropping a period.
    assert_eq!(response.status, QueryStatus::Failed);
    assert!(response.message.contains("Partition unavailable"));
    assert_eq!(fixture.engine.statement_count(), 1);
}

#[tokio::test]
async fn metric_with_no_dependencies_yields_no_data() {
    init_logging();
    // A derived metric whose formula references nothing resolves to zero
    // partitions; the statement is empty and the query succeeds empty.
    let metadata = Arc::new(MemoryMetadataProvider::new().with_metric(
        MetricDefinition::derived("KD_CONST", "1", AggFunc::Sum),
    ));
    let engine = Arc::new(ScriptedEngine::returning(vec![row(&[(
        "KD_CONST",
        Value::Number(1.0),
    )])]));
    let fixture = TestFixture::new(metadata, engine);

    let response = fixture
        .coordinator
        .process_query(&request(&["KD_CONST"], &["20251201"]))
        .await;

    assert_eq!(response.status, QueryStatus::Success, "{}", response.message);
    assert!(response.result.rows.is_empty());
    assert_eq!(fixture.engine.statement_count(), 0);
}
