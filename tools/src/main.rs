//! mart-runner: command-line driver for the customer mart pipeline.
//!
//! Usage:
//!   mart-runner seed  --db warehouse.db --seed 42 --rows 1500
//!   mart-runner seed  --db warehouse.db --source-json customers.json
//!   mart-runner run   --db warehouse.db [--select dim_customers]
//!   mart-runner test  --db warehouse.db
//!   mart-runner build --db warehouse.db
//!   mart-runner show  --db warehouse.db [--limit 10] [--json]
//!
//! With `--db :memory:` (the default) the source is seeded first, so
//! `mart-runner build` works on its own. `test` then builds every model
//! before testing, and `--select` is rejected for `build` because the
//! unselected models would be tested as empty tables.

use anyhow::{bail, Result};
use custmart_core::{
    config::PipelineConfig,
    engine::PipelineEngine,
    record::DimCustomer,
    seed,
    store::{SegmentSummary, TierCount, WarehouseStore},
    validation::ValidationReport,
};
use std::env;
use std::path::Path;

#[derive(serde::Serialize)]
struct MartSummary {
    raw_customers: i64,
    tiers: Vec<TierCount>,
    segments: Vec<SegmentSummary>,
    top_customers: Vec<DimCustomer>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("build");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let select = flag_value(&args, "--select");
    let source_json = flag_value(&args, "--source-json");
    let seed_value = parse_arg(&args, "--seed", 42u64);
    let limit = parse_arg(&args, "--limit", 10usize);
    let json_output = args.iter().any(|a| a == "--json");

    let mut config = PipelineConfig::load(data_dir)?;
    if let Some(rows) = flag_value(&args, "--rows").and_then(|v| v.parse().ok()) {
        config.seed.rows = rows;
    }

    let store = WarehouseStore::open(db)?;
    store.migrate()?;

    if command == "seed" || (db == ":memory:" && command != "show") {
        seed_source(&store, &config, seed_value, source_json)?;
        if command == "seed" {
            return Ok(());
        }
    }

    let run_id = format!("run-{}", uuid::Uuid::new_v4());
    let mut engine = PipelineEngine::build(run_id.clone(), config, store)?;

    match command {
        "run" => {
            engine.run_selected(select)?;
            print_run(&engine)?;
        }
        "test" | "build" => {
            if let Some(selection) = build_before_test(command, db == ":memory:", select)? {
                engine.run_selected(selection)?;
                print_run(&engine)?;
            }
            let report = engine.test()?;
            print_report(&report);
            report.ensure_success()?;
        }
        "show" => print_summary(&engine.store, limit, json_output)?,
        other => bail!("unknown command '{other}' (expected seed, run, test, build or show)"),
    }

    println!();
    println!("run_id: {run_id} ({})", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}

/// Which models to build before the data tests run, if any.
///
/// An in-memory warehouse starts empty on every invocation, so testing it
/// only means something after the whole graph has been built.
fn build_before_test<'a>(
    command: &str,
    in_memory: bool,
    select: Option<&'a str>,
) -> Result<Option<Option<&'a str>>> {
    match (command, in_memory, select) {
        ("build", true, Some(model)) => bail!(
            "--select {model} needs a persistent --db; \
             unselected models would be tested as empty tables"
        ),
        ("build", _, selection) => Ok(Some(selection)),
        ("test", true, _) => Ok(Some(None)),
        _ => Ok(None),
    }
}

fn seed_source(
    store: &WarehouseStore,
    config: &PipelineConfig,
    seed_value: u64,
    source_json: Option<&str>,
) -> Result<()> {
    let rows = match source_json {
        Some(path) => seed::load_customers_json(Path::new(path))?,
        None => seed::generate_customers(&config.seed, seed_value),
    };
    store.clear_raw_customers()?;
    let n = store.insert_raw_customers(&rows)?;
    log::info!("seeded raw_customer with {n} rows");
    println!("raw_customer: {n} rows loaded");
    Ok(())
}

fn print_run(engine: &PipelineEngine) -> Result<()> {
    println!("=== RUN ===");
    for entry in engine.events()? {
        if entry.event_type == "source_loaded" || entry.event_type == "model_materialized" {
            println!("  {:<16} {}", entry.stage, entry.payload);
        }
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    println!("=== TESTS ===");
    for r in &report.results {
        let status = if r.failures == 0 { "PASS" } else { "FAIL" };
        println!(
            "  {status}  {}.{} {} ({} failures)",
            r.model, r.column, r.test, r.failures
        );
        if !r.samples.is_empty() {
            println!("        e.g. {}", r.samples.join(", "));
        }
    }
    if report.stopped_early {
        println!("  (stopped at first failure)");
    }
    println!("  {} passed, {} failed", report.passed(), report.failed());
}

fn print_summary(store: &WarehouseStore, limit: usize, json_output: bool) -> Result<()> {
    let summary = MartSummary {
        raw_customers: store.raw_customer_count()?,
        tiers: store.tier_counts()?,
        segments: store.segment_summary()?,
        top_customers: store.top_customers(limit)?,
    };
    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("=== MART SUMMARY ===");
    println!("  raw customers:  {}", summary.raw_customers);
    println!();
    println!("  tiers:");
    for t in &summary.tiers {
        println!("    {:<10} {}", t.tier.label(), t.customers);
    }
    println!();
    println!("  segments:");
    for s in &summary.segments {
        let avg = s
            .avg_balance
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "    {:<12} {:>6} customers  avg balance {avg}",
            s.market_segment.as_deref().unwrap_or("(none)"),
            s.customers
        );
    }
    println!();
    println!("  top {limit} by balance:");
    for c in &summary.top_customers {
        println!(
            "    #{:<5} {:<20} {:>10.2}  {}",
            c.wealth_rank,
            c.customer_name.as_deref().unwrap_or("-"),
            c.account_balance.unwrap_or(0.0),
            c.customer_tier.label()
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
