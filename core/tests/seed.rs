//! Source seeding and configuration loading.

use custmart_core::{
    config::{FailureMode, PipelineConfig, RankMethod, SeedConfig},
    seed::{customer_name, generate_customers, load_customers_json},
    store::WarehouseStore,
};
use std::collections::HashSet;

fn data_dir() -> String {
    format!("{}/../data", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn same_seed_generates_identical_rows() {
    let config = SeedConfig::default();
    let a = generate_customers(&config, 0xDEAD_BEEF);
    let b = generate_customers(&config, 0xDEAD_BEEF);
    assert_eq!(a, b);

    let c = generate_customers(&config, 0xFEED);
    assert_ne!(a, c, "different seeds should produce different rows");
}

#[test]
fn generated_rows_respect_config() {
    let config = SeedConfig {
        rows: 500,
        ..SeedConfig::default()
    };
    let rows = generate_customers(&config, 42);
    assert_eq!(rows.len(), 500);

    let keys: HashSet<i64> = rows.iter().map(|r| r.c_custkey).collect();
    assert_eq!(keys.len(), 500, "keys are unique");

    for r in &rows {
        assert_eq!(r.c_name.as_deref(), Some(customer_name(r.c_custkey).as_str()));
        let nation = r.c_nationkey.unwrap();
        assert!((0..config.nation_count).contains(&nation));

        let phone = r.c_phone.as_deref().unwrap();
        assert!(phone.starts_with(&format!("{}-", nation + 10)), "phone {phone}");
        assert_eq!(phone.len(), 15);

        let balance = r.c_acctbal.unwrap();
        assert!(balance >= config.min_balance && balance <= config.max_balance);
        assert!(config.segments.contains(r.c_mktsegment.as_ref().unwrap()));
    }
}

#[test]
fn customer_names_are_zero_padded() {
    assert_eq!(customer_name(1), "Customer#000000001");
    assert_eq!(customer_name(150000), "Customer#000150000");
}

#[test]
fn json_source_loads_with_missing_columns_as_null() {
    let path = std::env::temp_dir().join(format!("custmart-seed-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"[
            {"c_custkey": 1, "c_name": "alpha", "c_acctbal": 12.345, "c_mktsegment": "BUILDING"},
            {"c_custkey": 2}
        ]"#,
    )
    .unwrap();

    let rows = load_customers_json(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].c_acctbal, Some(12.345));
    assert_eq!(rows[1].c_name, None);
    assert_eq!(rows[1].c_acctbal, None);

    let store = WarehouseStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_raw_customers(&rows).unwrap();
    assert_eq!(store.raw_customers().unwrap(), rows);
}

#[test]
fn repository_config_loads() {
    let config = PipelineConfig::load(&data_dir()).unwrap();
    assert_eq!(config.rank_method, RankMethod::Dense);
    assert_eq!(config.failure_mode, FailureMode::CollectAll);
    assert_eq!(config.tiers.platinum_max_rank, 100);
    assert_eq!(config.tiers.gold_max_rank, 500);
    assert_eq!(config.tiers.silver_max_rank, 1000);
    assert_eq!(config.seed.rows, 1500);

    let stg = config.schema_for("stg_customers").unwrap();
    assert!(stg.columns.iter().any(|c| c.name == "balance_status" && !c.tests.is_empty()));
    assert!(config.schema_for("dim_customers").is_some());
    assert!(config.schema_for("fct_orders").is_none());
}

#[test]
fn missing_data_dir_is_an_error() {
    assert!(PipelineConfig::load("/nonexistent/custmart").is_err());
}
