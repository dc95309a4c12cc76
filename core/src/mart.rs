//! `dim_customers`: segment statistics, wealth ranking and tiering on top
//! of `stg_customers`.
//!
//! Window semantics, expressed as explicit passes over the staged rows:
//!   - segment_count        COUNT(*) over (partition by market_segment)
//!   - avg_segment_balance  AVG(balance) over (partition by market_segment),
//!                          nulls ignored, null if the partition has none
//!   - wealth_rank          DENSE_RANK or RANK over (order by balance desc
//!                          nulls last); see RankMethod
//!
//! Null segments form a single partition. Output is ordered by
//! (wealth_rank, customer_key), so ties are listed by ascending key.

use crate::{
    config::{RankMethod, TierThresholds},
    error::PipelineResult,
    model::{Model, ModelContext, Relation},
    record::{CleanedCustomer, CustomerTier, DimCustomer},
    staging,
};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const MODEL_NAME: &str = "dim_customers";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStats {
    pub count: u64,
    pub avg_balance: Option<f64>,
}

/// One pass over the rows, grouped by market segment.
pub fn segment_stats(rows: &[CleanedCustomer]) -> HashMap<Option<String>, SegmentStats> {
    // (row count, non-null balance count, balance sum)
    let mut acc: HashMap<Option<String>, (u64, u64, f64)> = HashMap::new();
    for row in rows {
        let entry = acc.entry(row.market_segment.clone()).or_default();
        entry.0 += 1;
        if let Some(balance) = row.account_balance {
            entry.1 += 1;
            entry.2 += balance;
        }
    }
    acc.into_iter()
        .map(|(segment, (count, balances, sum))| {
            let avg_balance = (balances > 0).then(|| sum / balances as f64);
            (segment, SegmentStats { count, avg_balance })
        })
        .collect()
}

/// Balance descending, nulls last, then key ascending.
fn wealth_order(a: &CleanedCustomer, b: &CleanedCustomer) -> Ordering {
    let by_balance = match (a.account_balance, b.account_balance) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_balance.then(a.customer_key.cmp(&b.customer_key))
}

/// Wealth rank for every row, aligned with the input slice.
/// All null balances share the last rank.
pub fn wealth_ranks(rows: &[CleanedCustomer], method: RankMethod) -> Vec<u64> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| wealth_order(&rows[a], &rows[b]));

    let mut ranks = vec![0u64; rows.len()];
    let mut previous: Option<Option<f64>> = None;
    let mut rank = 0u64;
    for (position, &idx) in order.iter().enumerate() {
        let balance = rows[idx].account_balance;
        if previous != Some(balance) {
            rank = match method {
                RankMethod::Dense => rank + 1,
                RankMethod::Standard => position as u64 + 1,
            };
            previous = Some(balance);
        }
        ranks[idx] = rank;
    }
    ranks
}

pub fn enrich_customers(
    rows: &[CleanedCustomer],
    method: RankMethod,
    tiers: &TierThresholds,
) -> Vec<DimCustomer> {
    let stats = segment_stats(rows);
    let ranks = wealth_ranks(rows, method);

    let mut dims: Vec<DimCustomer> = rows
        .iter()
        .zip(ranks)
        .map(|(row, wealth_rank)| {
            let segment = stats
                .get(&row.market_segment)
                .copied()
                .unwrap_or(SegmentStats { count: 0, avg_balance: None });
            DimCustomer {
                customer_key: row.customer_key,
                customer_name: row.customer_name.clone(),
                address: row.address.clone(),
                nation_key: row.nation_key,
                account_balance: row.account_balance,
                market_segment: row.market_segment.clone(),
                balance_status: row.balance_status,
                segment_count: segment.count,
                avg_segment_balance: segment.avg_balance,
                wealth_rank,
                customer_tier: CustomerTier::from_rank(wealth_rank, tiers),
            }
        })
        .collect();
    dims.sort_by(|a, b| {
        a.wealth_rank
            .cmp(&b.wealth_rank)
            .then(a.customer_key.cmp(&b.customer_key))
    });
    dims
}

pub struct MartModel {
    rank_method: RankMethod,
    tiers: TierThresholds,
}

impl MartModel {
    pub fn new(rank_method: RankMethod, tiers: TierThresholds) -> Self {
        Self { rank_method, tiers }
    }
}

impl Model for MartModel {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[staging::MODEL_NAME]
    }

    fn run(&self, ctx: &ModelContext<'_>) -> PipelineResult<Relation> {
        let staged = ctx.staged_customers(staging::MODEL_NAME)?;
        let dims = enrich_customers(staged, self.rank_method, &self.tiers);
        log::debug!(
            "run={} model={MODEL_NAME}: enriched {} rows ({:?} rank)",
            ctx.run_id,
            dims.len(),
            self.rank_method
        );
        Ok(Relation::Dimensional(dims))
    }
}
