//! `stg_customers`: first-pass cleanup of `raw_customer`.
//!
//! One output row per input row. Nothing is filtered and nothing fails;
//! a null input column stays null.

use crate::{
    error::PipelineResult,
    model::{Model, ModelContext, Relation, RAW_CUSTOMER},
    record::{BalanceStatus, CleanedCustomer, RawCustomer},
};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::{str::FromStr, sync::LazyLock};

pub const MODEL_NAME: &str = "stg_customers";

static NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\D").expect("static pattern compiles"));

/// Strip every non-digit character.
pub fn digits_only(phone: &str) -> String {
    NON_DIGIT.replace_all(phone, "").into_owned()
}

/// Round to cents, half away from zero.
///
/// Rounding happens on the shortest decimal form of the value, so 2.675
/// (stored as 2.67499999...) rounds the way a decimal column would while
/// 0.0049999996 still rounds down. Negative zero is folded into zero.
pub fn round_currency(value: f64) -> f64 {
    match Decimal::from_str(&value.to_string()) {
        Ok(d) => {
            let cents = d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            // Scale is at most 2 here, so one division gives the nearest f64.
            cents.mantissa() as f64 / 10f64.powi(cents.scale() as i32) + 0.0
        }
        // Outside Decimal's range there is no fractional part left to round.
        Err(_) => value + 0.0,
    }
}

pub fn clean_customer(raw: &RawCustomer) -> CleanedCustomer {
    let account_balance = raw.c_acctbal.map(round_currency);
    CleanedCustomer {
        customer_key: raw.c_custkey,
        customer_name: raw.c_name.as_deref().map(str::to_uppercase),
        address: raw.c_address.clone(),
        nation_key: raw.c_nationkey,
        phone_number: raw.c_phone.as_deref().map(digits_only),
        account_balance,
        market_segment: raw.c_mktsegment.clone(),
        comment: raw.c_comment.clone(),
        balance_status: account_balance.map(BalanceStatus::from_balance),
    }
}

pub fn stage_customers(raws: &[RawCustomer]) -> Vec<CleanedCustomer> {
    raws.iter().map(clean_customer).collect()
}

pub struct StagingModel;

impl Model for StagingModel {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[RAW_CUSTOMER]
    }

    fn run(&self, ctx: &ModelContext<'_>) -> PipelineResult<Relation> {
        let raws = ctx.raw_customers(RAW_CUSTOMER)?;
        let cleaned = stage_customers(raws);
        log::debug!(
            "run={} model={MODEL_NAME}: cleaned {} rows",
            ctx.run_id,
            cleaned.len()
        );
        Ok(Relation::Staged(cleaned))
    }
}
