//! Row types for the three relations: the raw source, the staging model
//! and the dimensional mart.

use crate::{config::TierThresholds, types::CustomerKey};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of `raw_customer`, exactly as the source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCustomer {
    pub c_custkey: CustomerKey,
    #[serde(default)]
    pub c_name: Option<String>,
    #[serde(default)]
    pub c_address: Option<String>,
    #[serde(default)]
    pub c_nationkey: Option<i64>,
    #[serde(default)]
    pub c_phone: Option<String>,
    #[serde(default)]
    pub c_acctbal: Option<f64>,
    #[serde(default)]
    pub c_mktsegment: Option<String>,
    #[serde(default)]
    pub c_comment: Option<String>,
}

/// One row of `stg_customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedCustomer {
    pub customer_key: CustomerKey,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub nation_key: Option<i64>,
    pub phone_number: Option<String>,
    pub account_balance: Option<f64>,
    pub market_segment: Option<String>,
    pub comment: Option<String>,
    pub balance_status: Option<BalanceStatus>,
}

/// One row of `dim_customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimCustomer {
    pub customer_key: CustomerKey,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub nation_key: Option<i64>,
    pub account_balance: Option<f64>,
    pub market_segment: Option<String>,
    pub balance_status: Option<BalanceStatus>,
    pub segment_count: u64,
    pub avg_segment_balance: Option<f64>,
    pub wealth_rank: u64,
    pub customer_tier: CustomerTier,
}

// ── Labels ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceStatus {
    #[serde(rename = "Positive Balance")]
    Positive,
    #[serde(rename = "Zero Balance")]
    Zero,
    #[serde(rename = "Negative Balance")]
    Negative,
}

impl BalanceStatus {
    pub const LABELS: [&'static str; 3] = ["Positive Balance", "Zero Balance", "Negative Balance"];

    /// Sign test against zero. Callers pass the already rounded balance.
    pub fn from_balance(balance: f64) -> Self {
        if balance > 0.0 {
            Self::Positive
        } else if balance == 0.0 {
            Self::Zero
        } else {
            Self::Negative
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Positive => "Positive Balance",
            Self::Zero => "Zero Balance",
            Self::Negative => "Negative Balance",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Positive Balance" => Some(Self::Positive),
            "Zero Balance" => Some(Self::Zero),
            "Negative Balance" => Some(Self::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerTier {
    Platinum,
    Gold,
    Silver,
    Bronze,
}

impl CustomerTier {
    pub const LABELS: [&'static str; 4] = ["Platinum", "Gold", "Silver", "Bronze"];

    /// Buckets are inclusive upper bounds; the last one catches everything.
    pub fn from_rank(rank: u64, tiers: &TierThresholds) -> Self {
        if rank <= tiers.platinum_max_rank {
            Self::Platinum
        } else if rank <= tiers.gold_max_rank {
            Self::Gold
        } else if rank <= tiers.silver_max_rank {
            Self::Silver
        } else {
            Self::Bronze
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Platinum => "Platinum",
            Self::Gold => "Gold",
            Self::Silver => "Silver",
            Self::Bronze => "Bronze",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Platinum" => Some(Self::Platinum),
            "Gold" => Some(Self::Gold),
            "Silver" => Some(Self::Silver),
            "Bronze" => Some(Self::Bronze),
            _ => None,
        }
    }
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ToSql for BalanceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for BalanceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        Self::from_label(label)
            .ok_or_else(|| FromSqlError::Other(format!("unknown balance status '{label}'").into()))
    }
}

impl ToSql for CustomerTier {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for CustomerTier {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        Self::from_label(label)
            .ok_or_else(|| FromSqlError::Other(format!("unknown customer tier '{label}'").into()))
    }
}

// ── Column access for data tests ───────────────────────────────────

/// A single cell, as seen by the data-test runner.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Comparable text form; `None` for null.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::Null, Value::Text)
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Value::Null, Value::Int)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Null, Value::Float)
    }
}

/// Named-column access to a row type.
pub trait Row {
    const COLUMNS: &'static [&'static str];

    /// `None` when the row type has no such column.
    fn value(&self, column: &str) -> Option<Value>;
}

impl Row for RawCustomer {
    const COLUMNS: &'static [&'static str] = &[
        "c_custkey",
        "c_name",
        "c_address",
        "c_nationkey",
        "c_phone",
        "c_acctbal",
        "c_mktsegment",
        "c_comment",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "c_custkey" => Value::Int(self.c_custkey),
            "c_name" => self.c_name.clone().into(),
            "c_address" => self.c_address.clone().into(),
            "c_nationkey" => self.c_nationkey.into(),
            "c_phone" => self.c_phone.clone().into(),
            "c_acctbal" => self.c_acctbal.into(),
            "c_mktsegment" => self.c_mktsegment.clone().into(),
            "c_comment" => self.c_comment.clone().into(),
            _ => return None,
        })
    }
}

impl Row for CleanedCustomer {
    const COLUMNS: &'static [&'static str] = &[
        "customer_key",
        "customer_name",
        "address",
        "nation_key",
        "phone_number",
        "account_balance",
        "market_segment",
        "comment",
        "balance_status",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "customer_key" => Value::Int(self.customer_key),
            "customer_name" => self.customer_name.clone().into(),
            "address" => self.address.clone().into(),
            "nation_key" => self.nation_key.into(),
            "phone_number" => self.phone_number.clone().into(),
            "account_balance" => self.account_balance.into(),
            "market_segment" => self.market_segment.clone().into(),
            "comment" => self.comment.clone().into(),
            "balance_status" => self.balance_status.map(|s| s.label().to_string()).into(),
            _ => return None,
        })
    }
}

impl Row for DimCustomer {
    const COLUMNS: &'static [&'static str] = &[
        "customer_key",
        "customer_name",
        "address",
        "nation_key",
        "account_balance",
        "market_segment",
        "balance_status",
        "segment_count",
        "avg_segment_balance",
        "wealth_rank",
        "customer_tier",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "customer_key" => Value::Int(self.customer_key),
            "customer_name" => self.customer_name.clone().into(),
            "address" => self.address.clone().into(),
            "nation_key" => self.nation_key.into(),
            "account_balance" => self.account_balance.into(),
            "market_segment" => self.market_segment.clone().into(),
            "balance_status" => self.balance_status.map(|s| s.label().to_string()).into(),
            "segment_count" => Value::Int(self.segment_count as i64),
            "avg_segment_balance" => self.avg_segment_balance.into(),
            "wealth_rank" => Value::Int(self.wealth_rank as i64),
            "customer_tier" => Value::Text(self.customer_tier.label().to_string()),
            _ => return None,
        })
    }
}
