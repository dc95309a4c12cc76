//! Run events, persisted in order to the event log.

use crate::types::RunId;
use serde::{Deserialize, Serialize};

/// Every event emitted during a pipeline run.
/// Variants may be added; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: RunId,
        models: Vec<String>,
    },
    SourceLoaded {
        source: String,
        rows: usize,
    },
    ModelStarted {
        model: String,
    },
    ModelMaterialized {
        model: String,
        rows: usize,
    },
    ValidationCompleted {
        passed: usize,
        failed: usize,
        stopped_early: bool,
    },
    RunCompleted {
        run_id: RunId,
        models_built: usize,
    },
}

/// A row in the event_log table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub seq: u64,
    pub stage: String,
    pub event_type: String,
    pub payload: String,
}
