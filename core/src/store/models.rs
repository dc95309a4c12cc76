use super::WarehouseStore;
use crate::{
    error::PipelineResult,
    record::{CleanedCustomer, CustomerTier, DimCustomer},
};
use rusqlite::{params, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierCount {
    pub tier: CustomerTier,
    pub customers: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub market_segment: Option<String>,
    pub customers: i64,
    pub avg_balance: Option<f64>,
}

const DIM_COLUMNS: &str = "customer_key, customer_name, address, nation_key, account_balance,
     market_segment, balance_status, segment_count, avg_segment_balance,
     wealth_rank, customer_tier";

fn dim_from_row(row: &Row<'_>) -> rusqlite::Result<DimCustomer> {
    Ok(DimCustomer {
        customer_key: row.get(0)?,
        customer_name: row.get(1)?,
        address: row.get(2)?,
        nation_key: row.get(3)?,
        account_balance: row.get(4)?,
        market_segment: row.get(5)?,
        balance_status: row.get(6)?,
        segment_count: row.get::<_, i64>(7)? as u64,
        avg_segment_balance: row.get(8)?,
        wealth_rank: row.get::<_, i64>(9)? as u64,
        customer_tier: row.get(10)?,
    })
}

impl WarehouseStore {
    // ── stg_customers ─────────────────────────────────────────────

    /// Full refresh: delete every row, insert the new ones, one transaction.
    pub fn replace_stg_customers(&self, rows: &[CleanedCustomer]) -> PipelineResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM stg_customers", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO stg_customers (
                    customer_key, customer_name, address, nation_key, phone_number,
                    account_balance, market_segment, comment, balance_status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for c in rows {
                stmt.execute(params![
                    c.customer_key,
                    c.customer_name,
                    c.address,
                    c.nation_key,
                    c.phone_number,
                    c.account_balance,
                    c.market_segment,
                    c.comment,
                    c.balance_status,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn stg_customers(&self) -> PipelineResult<Vec<CleanedCustomer>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_key, customer_name, address, nation_key, phone_number,
                    account_balance, market_segment, comment, balance_status
             FROM stg_customers ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CleanedCustomer {
                customer_key: row.get(0)?,
                customer_name: row.get(1)?,
                address: row.get(2)?,
                nation_key: row.get(3)?,
                phone_number: row.get(4)?,
                account_balance: row.get(5)?,
                market_segment: row.get(6)?,
                comment: row.get(7)?,
                balance_status: row.get(8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── dim_customers ─────────────────────────────────────────────

    pub fn replace_dim_customers(&self, rows: &[DimCustomer]) -> PipelineResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM dim_customers", [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO dim_customers ({DIM_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))?;
            for c in rows {
                stmt.execute(params![
                    c.customer_key,
                    c.customer_name,
                    c.address,
                    c.nation_key,
                    c.account_balance,
                    c.market_segment,
                    c.balance_status,
                    c.segment_count as i64,
                    c.avg_segment_balance,
                    c.wealth_rank as i64,
                    c.customer_tier,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn dim_customers(&self) -> PipelineResult<Vec<DimCustomer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {DIM_COLUMNS} FROM dim_customers ORDER BY rowid ASC"))?;
        let rows = stmt.query_map([], dim_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// The `limit` wealthiest customers.
    pub fn top_customers(&self, limit: usize) -> PipelineResult<Vec<DimCustomer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DIM_COLUMNS} FROM dim_customers
             ORDER BY wealth_rank ASC, customer_key ASC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], dim_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn tier_counts(&self) -> PipelineResult<Vec<TierCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_tier, COUNT(*) FROM dim_customers
             GROUP BY customer_tier ORDER BY MIN(wealth_rank) ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TierCount {
                tier: row.get(0)?,
                customers: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn segment_summary(&self) -> PipelineResult<Vec<SegmentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT market_segment, MAX(segment_count), MAX(avg_segment_balance)
             FROM dim_customers GROUP BY market_segment ORDER BY market_segment ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SegmentSummary {
                market_segment: row.get(0)?,
                customers: row.get(1)?,
                avg_balance: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
