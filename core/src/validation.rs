//! Post-transform data tests driven by the column constraints in schema.json.
//!
//! Null handling follows the usual warehouse test semantics: only
//! `not_null` looks at nulls; `unique`, `accepted_values` and
//! `relationships` skip them.

use crate::{
    config::{ColumnTest, FailureMode, ModelSchema},
    error::{PipelineError, PipelineResult},
    model::Relation,
    record::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Failing values kept per test for reporting.
pub const MAX_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub model: String,
    pub column: String,
    pub test: String,
    pub status: TestStatus,
    /// Failing rows, or failing distinct values for `unique` and
    /// `accepted_values`.
    pub failures: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<TestResult>,
    /// Set when fail-fast mode skipped the remaining tests.
    pub stopped_early: bool,
}

impl ValidationReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.status == TestStatus::Pass).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.status == TestStatus::Fail).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.status == TestStatus::Fail)
    }

    pub fn ensure_success(&self) -> PipelineResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(PipelineError::ValidationFailed {
                failed: self.failed(),
                total: self.results.len(),
            })
        }
    }
}

// ── Checks ─────────────────────────────────────────────────────────
// Each returns the offending values; the runner counts and samples them.

/// Distinct non-null values that occur more than once.
pub fn check_unique(values: &[Value]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in values.iter().filter_map(Value::key) {
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(key, _)| key)
        .collect()
}

/// One entry per null row, naming its position.
pub fn check_not_null(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_null())
        .map(|(row, _)| format!("row {row}"))
        .collect()
}

/// Distinct non-null values outside the accepted set.
pub fn check_accepted_values(values: &[Value], accepted: &[String]) -> Vec<String> {
    let accepted: HashSet<&str> = accepted.iter().map(String::as_str).collect();
    let offending: BTreeSet<String> = values
        .iter()
        .filter_map(Value::key)
        .filter(|key| !accepted.contains(key.as_str()))
        .collect();
    offending.into_iter().collect()
}

/// Non-null child values with no match among the parent values.
pub fn check_relationships(child: &[Value], parent: &[Value]) -> Vec<String> {
    let parent: HashSet<String> = parent.iter().filter_map(Value::key).collect();
    child
        .iter()
        .filter_map(Value::key)
        .filter(|key| !parent.contains(key))
        .collect()
}

// ── Runner ─────────────────────────────────────────────────────────

fn column_values(
    relations: &HashMap<String, Relation>,
    model: &str,
    column: &str,
) -> PipelineResult<Vec<Value>> {
    let relation = relations
        .get(model)
        .ok_or_else(|| PipelineError::RelationMissing { name: model.to_string() })?;
    relation.column(column).ok_or_else(|| {
        PipelineError::InvalidConfig(format!("model '{model}' has no column '{column}'"))
    })
}

fn run_one(
    relations: &HashMap<String, Relation>,
    model: &str,
    column: &str,
    test: &ColumnTest,
) -> PipelineResult<TestResult> {
    let values = column_values(relations, model, column)?;
    let offending = match test {
        ColumnTest::Unique => check_unique(&values),
        ColumnTest::NotNull => check_not_null(&values),
        ColumnTest::AcceptedValues { values: accepted } => {
            check_accepted_values(&values, accepted)
        }
        ColumnTest::Relationships { to, field } => {
            let parent = column_values(relations, to, field)?;
            check_relationships(&values, &parent)
        }
    };

    Ok(TestResult {
        model: model.to_string(),
        column: column.to_string(),
        test: test.name().to_string(),
        status: if offending.is_empty() {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        },
        failures: offending.len(),
        samples: offending.into_iter().take(MAX_SAMPLES).collect(),
    })
}

/// Run every declared test, in schema order.
///
/// `relations` must hold every model named in `schemas`, plus the targets
/// of any `relationships` test. A missing relation or unknown column is a
/// configuration error, not a test failure.
pub fn run_tests(
    schemas: &[ModelSchema],
    relations: &HashMap<String, Relation>,
    mode: FailureMode,
) -> PipelineResult<ValidationReport> {
    let mut report = ValidationReport::default();
    for schema in schemas {
        for column in &schema.columns {
            for test in &column.tests {
                let result = run_one(relations, &schema.name, &column.name, test)?;
                let failed = result.status == TestStatus::Fail;
                if failed {
                    log::warn!(
                        "test {}.{} {}: {} failures (e.g. {:?})",
                        result.model,
                        result.column,
                        result.test,
                        result.failures,
                        result.samples
                    );
                }
                report.results.push(result);
                if failed && mode == FailureMode::FailFast {
                    report.stopped_early = true;
                    return Ok(report);
                }
            }
        }
    }
    Ok(report)
}

/// Relations the given schemas read, including `relationships` targets.
pub fn required_relations(schemas: &[ModelSchema]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };
    for schema in schemas {
        push(&schema.name);
        for column in &schema.columns {
            for test in &column.tests {
                if let ColumnTest::Relationships { to, .. } = test {
                    push(to);
                }
            }
        }
    }
    names
}
