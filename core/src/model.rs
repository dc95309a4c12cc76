//! Model trait and the relations models exchange.
//!
//! RULE: A model reads its inputs ONLY through ModelContext::upstream().
//! Upstream names must be declared in depends_on(); the graph uses them
//! to order execution.

use crate::{
    error::{PipelineError, PipelineResult},
    record::{CleanedCustomer, DimCustomer, RawCustomer, Row, Value},
};
use std::collections::HashMap;

/// Name of the external source table.
pub const RAW_CUSTOMER: &str = "raw_customer";

/// The rows a source or model produced in the current run.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    Raw(Vec<RawCustomer>),
    Staged(Vec<CleanedCustomer>),
    Dimensional(Vec<DimCustomer>),
}

impl Relation {
    pub fn len(&self) -> usize {
        match self {
            Self::Raw(rows) => rows.len(),
            Self::Staged(rows) => rows.len(),
            Self::Dimensional(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw customer",
            Self::Staged(_) => "staged customer",
            Self::Dimensional(_) => "dimensional customer",
        }
    }

    /// All values of one column, in row order. `None` for an unknown column.
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        match self {
            Self::Raw(rows) => column_of(rows, name),
            Self::Staged(rows) => column_of(rows, name),
            Self::Dimensional(rows) => column_of(rows, name),
        }
    }
}

fn column_of<R: Row>(rows: &[R], name: &str) -> Option<Vec<Value>> {
    if !R::COLUMNS.contains(&name) {
        return None;
    }
    rows.iter().map(|row| row.value(name)).collect()
}

/// What a model may see while it runs.
pub struct ModelContext<'a> {
    pub run_id: &'a str,
    relations: &'a HashMap<String, Relation>,
}

impl<'a> ModelContext<'a> {
    pub fn new(run_id: &'a str, relations: &'a HashMap<String, Relation>) -> Self {
        Self { run_id, relations }
    }

    pub fn upstream(&self, name: &str) -> PipelineResult<&'a Relation> {
        self.relations
            .get(name)
            .ok_or_else(|| PipelineError::RelationMissing { name: name.to_string() })
    }

    pub fn raw_customers(&self, name: &str) -> PipelineResult<&'a [RawCustomer]> {
        match self.upstream(name)? {
            Relation::Raw(rows) => Ok(rows),
            other => Err(kind_mismatch(name, "raw customer", other)),
        }
    }

    pub fn staged_customers(&self, name: &str) -> PipelineResult<&'a [CleanedCustomer]> {
        match self.upstream(name)? {
            Relation::Staged(rows) => Ok(rows),
            other => Err(kind_mismatch(name, "staged customer", other)),
        }
    }
}

fn kind_mismatch(name: &str, expected: &'static str, actual: &Relation) -> PipelineError {
    PipelineError::RelationKind {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}

/// How a model's relation is persisted after it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialization {
    /// Fully replaced in the warehouse on every run.
    Table,
    /// Kept in memory for downstream models only.
    Ephemeral,
}

/// The contract every model must fulfill.
pub trait Model: Send {
    /// Unique stable name; also the name downstream models depend on.
    fn name(&self) -> &'static str;

    /// Sources and models this one reads.
    fn depends_on(&self) -> &'static [&'static str];

    fn materialization(&self) -> Materialization {
        Materialization::Table
    }

    /// Build the full relation from scratch. Called once per run.
    fn run(&self, ctx: &ModelContext<'_>) -> PipelineResult<Relation>;
}
