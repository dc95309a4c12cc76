//! Synthetic `raw_customer` rows in the shape of the TPC-H CUSTOMER table,
//! plus loading of hand-written rows from JSON.

use crate::{
    config::SeedConfig,
    error::PipelineResult,
    record::RawCustomer,
    rng::{SeedBank, SeedRng},
};
use std::path::Path;

const ADDRESS_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 ,";

const COMMENT_WORDS: &[&str] = &[
    "furiously", "quickly", "carefully", "blithely", "slyly", "ironic", "final",
    "regular", "express", "pending", "special", "bold", "even", "silent", "unusual",
    "deposits", "requests", "accounts", "packages", "instructions", "theodolites",
    "foxes", "pinto", "beans", "ideas", "dependencies", "platelets", "asymptotes",
    "sleep", "wake", "haggle", "nag", "use", "cajole", "detect", "integrate",
    "boost", "among", "across", "above", "after", "against", "along", "the",
];

pub fn customer_name(key: i64) -> String {
    format!("Customer#{key:09}")
}

fn address(rng: &mut SeedRng) -> String {
    let len = rng.next_i64_between(10, 40) as usize;
    (0..len)
        .map(|_| *rng.pick(ADDRESS_CHARS) as char)
        .collect::<String>()
        .trim()
        .to_string()
}

/// `CC-LLL-LLL-LLLL`, where CC is the nation key plus 10.
fn phone(nation_key: i64, rng: &mut SeedRng) -> String {
    format!(
        "{}-{:03}-{:03}-{:04}",
        nation_key + 10,
        rng.next_i64_between(100, 999),
        rng.next_i64_between(100, 999),
        rng.next_i64_between(1000, 9999)
    )
}

/// Whole cents drawn uniformly from the configured range.
fn balance(config: &SeedConfig, rng: &mut SeedRng) -> f64 {
    let lo = (config.min_balance * 100.0).round() as i64;
    let hi = (config.max_balance * 100.0).round() as i64;
    rng.next_i64_between(lo, hi) as f64 / 100.0
}

fn comment(rng: &mut SeedRng) -> String {
    let words = rng.next_i64_between(4, 12);
    (0..words)
        .map(|_| *rng.pick(COMMENT_WORDS))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate `config.rows` customers keyed 1..=rows. Same seed, same rows.
pub fn generate_customers(config: &SeedConfig, seed: u64) -> Vec<RawCustomer> {
    let mut bank = SeedBank::new(seed);
    (1..=config.rows as i64)
        .map(|key| {
            let nation_key = bank.nation.next_i64_between(0, config.nation_count - 1);
            RawCustomer {
                c_custkey: key,
                c_name: Some(customer_name(key)),
                c_address: Some(address(&mut bank.address)),
                c_nationkey: Some(nation_key),
                c_phone: Some(phone(nation_key, &mut bank.phone)),
                c_acctbal: Some(balance(config, &mut bank.balance)),
                c_mktsegment: Some(bank.segment.pick(&config.segments).clone()),
                c_comment: Some(comment(&mut bank.comment)),
            }
        })
        .collect()
}

/// Read a JSON array of raw customer objects. Missing columns load as null.
pub fn load_customers_json(path: &Path) -> PipelineResult<Vec<RawCustomer>> {
    let content = std::fs::read_to_string(path)?;
    let rows: Vec<RawCustomer> = serde_json::from_str(&content)?;
    log::info!("loaded {} raw customers from {}", rows.len(), path.display());
    Ok(rows)
}
