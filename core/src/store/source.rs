use super::WarehouseStore;
use crate::{error::PipelineResult, record::RawCustomer};
use rusqlite::params;

impl WarehouseStore {
    // ── Raw source ────────────────────────────────────────────────

    /// Append rows to `raw_customer` in one transaction.
    pub fn insert_raw_customers(&self, rows: &[RawCustomer]) -> PipelineResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_customer (
                    c_custkey, c_name, c_address, c_nationkey, c_phone,
                    c_acctbal, c_mktsegment, c_comment
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for c in rows {
                stmt.execute(params![
                    c.c_custkey,
                    c.c_name,
                    c.c_address,
                    c.c_nationkey,
                    c.c_phone,
                    c.c_acctbal,
                    c.c_mktsegment,
                    c.c_comment,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn clear_raw_customers(&self) -> PipelineResult<()> {
        self.conn.execute("DELETE FROM raw_customer", [])?;
        Ok(())
    }

    /// All source rows in load order.
    pub fn raw_customers(&self) -> PipelineResult<Vec<RawCustomer>> {
        let mut stmt = self.conn.prepare(
            "SELECT c_custkey, c_name, c_address, c_nationkey, c_phone,
                    c_acctbal, c_mktsegment, c_comment
             FROM raw_customer ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RawCustomer {
                c_custkey: row.get(0)?,
                c_name: row.get(1)?,
                c_address: row.get(2)?,
                c_nationkey: row.get(3)?,
                c_phone: row.get(4)?,
                c_acctbal: row.get(5)?,
                c_mktsegment: row.get(6)?,
                c_comment: row.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn raw_customer_count(&self) -> PipelineResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM raw_customer", [], |row| row.get(0))?;
        Ok(n)
    }
}
