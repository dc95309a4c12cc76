use super::WarehouseStore;
use crate::{
    error::PipelineResult,
    validation::{TestResult, TestStatus},
};
use rusqlite::params;

impl WarehouseStore {
    // ── Data-test results ─────────────────────────────────────────

    pub fn insert_test_results(&self, run_id: &str, results: &[TestResult]) -> PipelineResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO test_result (
                    run_id, model, column_name, test, status, failures, samples
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for r in results {
                let status = match r.status {
                    TestStatus::Pass => "pass",
                    TestStatus::Fail => "fail",
                };
                stmt.execute(params![
                    run_id,
                    r.model,
                    r.column,
                    r.test,
                    status,
                    r.failures as i64,
                    serde_json::to_string(&r.samples)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn test_results(&self, run_id: &str) -> PipelineResult<Vec<TestResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT model, column_name, test, status, failures, samples
             FROM test_result WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(model, column, test, status, failures, samples)| -> PipelineResult<TestResult> {
                Ok(TestResult {
                    model,
                    column,
                    test,
                    status: if status == "pass" {
                        TestStatus::Pass
                    } else {
                        TestStatus::Fail
                    },
                    failures: failures as usize,
                    samples: serde_json::from_str(&samples)?,
                })
            })
            .collect()
    }
}
