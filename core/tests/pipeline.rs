//! End-to-end runs: source -> stg_customers -> dim_customers -> data tests.

use custmart_core::{
    config::{ColumnSchema, ColumnTest, FailureMode, PipelineConfig, RankMethod},
    engine::PipelineEngine,
    event::PipelineEvent,
    error::PipelineResult,
    model::{Materialization, Model, ModelContext, Relation},
    record::{CustomerTier, RawCustomer},
    store::WarehouseStore,
    validation::TestStatus,
};
use std::collections::HashMap;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_engine(run_id: &str, seed: u64) -> PipelineEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    PipelineEngine::build_test(run_id.into(), seed).unwrap()
}

fn engine_over(rows: &[RawCustomer], config: PipelineConfig) -> PipelineEngine {
    let store = WarehouseStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_raw_customers(rows).unwrap();
    PipelineEngine::build("fixture-run".into(), config, store).unwrap()
}

fn raw(key: i64, segment: &str, balance: f64) -> RawCustomer {
    RawCustomer {
        c_custkey: key,
        c_name: Some(format!("Customer#{key:09}")),
        c_address: Some("addr".into()),
        c_nationkey: Some(3),
        c_phone: Some("13-761-547-5974".into()),
        c_acctbal: Some(balance),
        c_mktsegment: Some(segment.into()),
        c_comment: Some("pending deposits".into()),
    }
}

/// Staged customers with a positive balance, never written to the warehouse.
struct PositiveCustomers;

impl Model for PositiveCustomers {
    fn name(&self) -> &'static str {
        "positive_customers"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["stg_customers"]
    }

    fn materialization(&self) -> Materialization {
        Materialization::Ephemeral
    }

    fn run(&self, ctx: &ModelContext<'_>) -> PipelineResult<Relation> {
        let rows = ctx
            .staged_customers("stg_customers")?
            .iter()
            .filter(|c| c.account_balance.is_some_and(|b| b > 0.0))
            .cloned()
            .collect();
        Ok(Relation::Staged(rows))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn run_materializes_both_models_one_to_one() {
    let mut engine = make_engine("e2e-cardinality", 42);
    let summary = engine.run().unwrap();

    let raw_rows = engine.store.raw_customer_count().unwrap() as usize;
    assert_eq!(raw_rows, 200);
    assert_eq!(summary.sources, vec![("raw_customer".to_string(), raw_rows)]);
    assert_eq!(
        summary.models,
        vec![
            ("stg_customers".to_string(), raw_rows),
            ("dim_customers".to_string(), raw_rows),
        ]
    );

    let stg = engine.store.stg_customers().unwrap();
    let dim = engine.store.dim_customers().unwrap();
    assert_eq!(stg.len(), raw_rows);
    assert_eq!(dim.len(), stg.len(), "every cleaned row maps to one dim row");

    let mut stg_keys: Vec<i64> = stg.iter().map(|c| c.customer_key).collect();
    let mut dim_keys: Vec<i64> = dim.iter().map(|c| c.customer_key).collect();
    stg_keys.sort_unstable();
    dim_keys.sort_unstable();
    assert_eq!(stg_keys, dim_keys);
}

#[test]
fn stored_tables_match_in_memory_relations() {
    let mut engine = make_engine("e2e-roundtrip", 7);
    engine.run().unwrap();

    match engine.relation("dim_customers") {
        Some(Relation::Dimensional(rows)) => {
            assert_eq!(rows, &engine.store.dim_customers().unwrap());
        }
        other => panic!("expected dimensional relation, got {other:?}"),
    }
    match engine.relation("stg_customers") {
        Some(Relation::Staged(rows)) => {
            assert_eq!(rows, &engine.store.stg_customers().unwrap());
        }
        other => panic!("expected staged relation, got {other:?}"),
    }
}

#[test]
fn segment_columns_agree_with_staged_rows() {
    let mut engine = make_engine("e2e-segments", 99);
    engine.run().unwrap();

    let stg = engine.store.stg_customers().unwrap();
    let mut expected: HashMap<Option<String>, (u64, f64)> = HashMap::new();
    for c in &stg {
        let e = expected.entry(c.market_segment.clone()).or_default();
        e.0 += 1;
        e.1 += c.account_balance.unwrap();
    }

    for d in engine.store.dim_customers().unwrap() {
        let (count, sum) = expected[&d.market_segment];
        assert_eq!(d.segment_count, count);
        let avg = d.avg_segment_balance.unwrap();
        assert!(
            (avg - sum / count as f64).abs() < 1e-6,
            "segment {:?}: avg {avg} vs {}",
            d.market_segment,
            sum / count as f64
        );
        assert_eq!(d.customer_tier, CustomerTier::from_rank(d.wealth_rank, &engine.config.tiers));
    }
}

#[test]
fn generated_warehouse_passes_declared_tests() {
    let mut engine = make_engine("e2e-tests", 42);
    let (_, report) = engine.build_all().unwrap();

    assert!(report.is_success(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.results.len(), 9);

    let stored = engine.store.test_results("e2e-tests").unwrap();
    assert_eq!(stored, report.results);
}

#[test]
fn events_are_recorded_in_order() {
    let mut engine = make_engine("e2e-events", 1);
    engine.build_all().unwrap();

    let events = engine.events().unwrap();
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "run_started",
            "source_loaded",
            "model_started",
            "model_materialized",
            "model_started",
            "model_materialized",
            "run_completed",
            "validation_completed",
        ]
    );

    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (0..events.len() as u64).collect::<Vec<_>>());

    let last: PipelineEvent = serde_json::from_str(&events[7].payload).unwrap();
    assert_eq!(
        last,
        PipelineEvent::ValidationCompleted {
            passed: 9,
            failed: 0,
            stopped_early: false
        }
    );
    assert_eq!(
        engine.store.run_status("e2e-events").unwrap().as_deref(),
        Some("success")
    );
}

#[test]
fn rerun_is_a_full_refresh() {
    let mut engine = make_engine("e2e-refresh", 5);
    engine.run().unwrap();
    let first = engine.store.dim_customers().unwrap();

    engine.run().unwrap();
    let second = engine.store.dim_customers().unwrap();

    assert_eq!(first.len(), second.len(), "rerun must replace, not append");
    assert_eq!(first, second);
}

#[test]
fn rerun_picks_up_source_changes() {
    let mut engine = engine_over(&[raw(1, "BUILDING", 10.0)], PipelineConfig::default_test());
    engine.run().unwrap();
    assert_eq!(engine.store.dim_customers().unwrap().len(), 1);

    engine
        .store
        .insert_raw_customers(&[raw(2, "BUILDING", 30.0)])
        .unwrap();
    engine.run().unwrap();

    let dim = engine.store.dim_customers().unwrap();
    assert_eq!(dim.len(), 2);
    assert!(dim.iter().all(|d| d.segment_count == 2));
    assert!(dim.iter().all(|d| d.avg_segment_balance == Some(20.0)));
    assert_eq!(dim[0].customer_key, 2, "highest balance ranks first");
}

#[test]
fn select_builds_only_upstream_models() {
    let mut engine = make_engine("e2e-select", 3);
    assert_eq!(engine.plan(Some("stg_customers")).unwrap(), vec!["stg_customers"]);

    let summary = engine.run_selected(Some("stg_customers")).unwrap();
    assert_eq!(summary.models.len(), 1);
    assert_eq!(engine.store.stg_customers().unwrap().len(), 200);
    assert!(engine.store.dim_customers().unwrap().is_empty());
    assert!(engine.relation("dim_customers").is_none());
}

#[test]
fn standard_rank_config_flows_into_mart() {
    let mut config = PipelineConfig::default_test();
    config.rank_method = RankMethod::Standard;
    let rows = [
        raw(1, "A", 50.0),
        raw(2, "A", 100.0),
        raw(3, "A", 100.0),
        raw(4, "A", 10.0),
    ];
    let mut engine = engine_over(&rows, config);
    engine.run().unwrap();

    let ranks: Vec<(i64, u64)> = engine
        .store
        .dim_customers()
        .unwrap()
        .iter()
        .map(|d| (d.customer_key, d.wealth_rank))
        .collect();
    assert_eq!(ranks, vec![(2, 1), (3, 1), (1, 3), (4, 4)]);
}

#[test]
fn duplicate_source_keys_fail_unique_test() {
    let rows = [raw(1, "A", 1.0), raw(1, "A", 2.0), raw(2, "B", 3.0)];
    let mut engine = engine_over(&rows, PipelineConfig::default_test());
    let (summary, report) = engine.build_all().unwrap();

    assert_eq!(summary.models[1].1, 3, "duplicates are carried, not dropped");
    assert!(!report.is_success());
    let failed: Vec<(&str, &str)> = report
        .failures()
        .map(|r| (r.model.as_str(), r.test.as_str()))
        .collect();
    assert_eq!(failed, vec![("stg_customers", "unique"), ("dim_customers", "unique")]);
    assert!(report.ensure_success().is_err());
    assert_eq!(
        engine.store.run_status("fixture-run").unwrap().as_deref(),
        Some("error"),
        "failing data tests mark the run"
    );
}

#[test]
fn fail_fast_config_stops_after_first_failure() {
    let mut config = PipelineConfig::default_test();
    config.failure_mode = FailureMode::FailFast;
    let rows = [raw(1, "A", 1.0), raw(1, "A", 2.0)];
    let mut engine = engine_over(&rows, config);
    let (_, report) = engine.build_all().unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, TestStatus::Fail);
}

#[test]
fn test_on_fresh_engine_reads_materialized_tables() {
    let mut builder = make_engine("e2e-build", 11);
    builder.run().unwrap();
    let dim = builder.store.dim_customers().unwrap();

    // Hand the same warehouse to a new engine that never ran the models.
    let store = builder.store;
    let mut checker =
        PipelineEngine::build("e2e-check".into(), PipelineConfig::default_test(), store).unwrap();
    let report = checker.test().unwrap();
    assert!(report.is_success());
    assert_eq!(checker.store.dim_customers().unwrap(), dim);
}

#[test]
fn custom_column_test_on_mart() {
    let mut config = PipelineConfig::default_test();
    config.models[1].columns.push(ColumnSchema {
        name: "customer_tier".into(),
        description: None,
        tests: vec![ColumnTest::AcceptedValues {
            values: vec!["Platinum".into()],
        }],
    });
    // 150 distinct balances: ranks 101..=150 are Gold.
    let rows: Vec<RawCustomer> = (1..=150).map(|k| raw(k, "A", k as f64)).collect();
    let mut engine = engine_over(&rows, config);
    let (_, report) = engine.build_all().unwrap();

    let last = report.results.last().unwrap();
    assert_eq!(last.status, TestStatus::Fail);
    assert_eq!(last.samples, vec!["Gold"]);
}

#[test]
fn ephemeral_model_is_not_written_to_the_warehouse() {
    let rows = [raw(1, "A", 5.0), raw(2, "A", -5.0), raw(3, "B", 0.0)];
    let mut engine = engine_over(&rows, PipelineConfig::default_test());
    engine.register(Box::new(PositiveCustomers)).unwrap();

    let summary = engine.run().unwrap();
    assert_eq!(summary.models.last().unwrap(), &("positive_customers".to_string(), 1));

    match engine.relation("positive_customers") {
        Some(Relation::Staged(rows)) => assert_eq!(rows[0].customer_key, 1),
        other => panic!("expected staged relation, got {other:?}"),
    }
    assert_eq!(engine.store.stg_customers().unwrap().len(), 3);
}

#[test]
fn test_alone_closes_its_run() {
    let mut builder = make_engine("e2e-status-build", 4);
    builder.run().unwrap();

    let mut checker =
        PipelineEngine::build("e2e-status-test".into(), PipelineConfig::default_test(), builder.store)
            .unwrap();
    let report = checker.test().unwrap();
    assert!(report.is_success());
    assert_eq!(
        checker.store.run_status("e2e-status-test").unwrap().as_deref(),
        Some("success")
    );
}

#[test]
fn test_without_run_does_not_leave_run_open() {
    // Model tables exist but are empty; every declared test passes vacuously.
    let mut engine = make_engine("e2e-status-empty", 8);
    engine.test().unwrap();
    assert_eq!(
        engine.store.run_status("e2e-status-empty").unwrap().as_deref(),
        Some("success")
    );
}
