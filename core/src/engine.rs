//! The pipeline engine: runs the model graph, materializes every model and
//! runs the data tests.
//!
//! MODEL ORDER (derived from dependencies, see graph.rs):
//!   raw_customer (source) -> stg_customers -> dim_customers
//!
//! RULES:
//!   - Every run is a full refresh; model tables are replaced, never appended.
//!   - A model sees only relations produced earlier in the same run, or
//!     sources loaded from the store.
//!   - Every step is recorded in the event log, in order.

use crate::{
    config::PipelineConfig,
    error::PipelineResult,
    event::{EventLogEntry, PipelineEvent},
    graph::ModelGraph,
    mart::MartModel,
    model::{Materialization, Model, ModelContext, Relation, RAW_CUSTOMER},
    seed,
    staging::StagingModel,
    store::WarehouseStore,
    types::RunId,
    validation::{self, ValidationReport},
};
use std::collections::HashMap;

/// What one `run()` built.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub sources: Vec<(String, usize)>,
    pub models: Vec<(String, usize)>,
}

pub struct PipelineEngine {
    pub run_id: RunId,
    pub config: PipelineConfig,
    pub store: WarehouseStore,
    graph: ModelGraph,
    relations: HashMap<String, Relation>,
    next_seq: u64,
}

impl PipelineEngine {
    /// An engine with the source declared and no models registered.
    pub fn new(run_id: RunId, config: PipelineConfig, store: WarehouseStore) -> PipelineResult<Self> {
        let mut graph = ModelGraph::new();
        graph.add_source(RAW_CUSTOMER)?;
        Ok(Self {
            run_id,
            config,
            store,
            graph,
            relations: HashMap::new(),
            next_seq: 0,
        })
    }

    /// Build a fully wired engine with both models registered.
    pub fn build(run_id: RunId, config: PipelineConfig, store: WarehouseStore) -> PipelineResult<Self> {
        config.validate()?;
        let mart = MartModel::new(config.rank_method, config.tiers);
        let mut engine = Self::new(run_id, config, store)?;
        engine.register(Box::new(StagingModel))?;
        engine.register(Box::new(mart))?;
        Ok(engine)
    }

    /// In-memory engine over `PipelineConfig::default_test()`, with the
    /// source seeded from `seed`.
    pub fn build_test(run_id: RunId, seed: u64) -> PipelineResult<Self> {
        let store = WarehouseStore::in_memory()?;
        store.migrate()?;
        let config = PipelineConfig::default_test();
        store.insert_raw_customers(&seed::generate_customers(&config.seed, seed))?;
        Self::build(run_id, config, store)
    }

    pub fn register(&mut self, model: Box<dyn Model>) -> PipelineResult<()> {
        self.graph.register(model)
    }

    /// Model names in execution order.
    pub fn plan(&self, select: Option<&str>) -> PipelineResult<Vec<&'static str>> {
        let order = match select {
            Some(target) => self.graph.select(target)?,
            None => self.graph.execution_order()?,
        };
        Ok(order.into_iter().map(|idx| self.graph.model(idx).name()).collect())
    }

    /// The relation built (or loaded) under `name` during this engine's life.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Build every model.
    pub fn run(&mut self) -> PipelineResult<RunSummary> {
        self.run_selected(None)
    }

    /// Build `select` and its upstream models, or everything when `None`.
    pub fn run_selected(&mut self, select: Option<&str>) -> PipelineResult<RunSummary> {
        self.begin_run()?;
        match self.execute(select) {
            Ok(summary) => {
                self.finish_run("success")?;
                Ok(summary)
            }
            Err(e) => {
                log::warn!("run={} failed: {e}", self.run_id);
                self.finish_run("error")?;
                Err(e)
            }
        }
    }

    fn execute(&mut self, select: Option<&str>) -> PipelineResult<RunSummary> {
        let order = match select {
            Some(target) => self.graph.select(target)?,
            None => self.graph.execution_order()?,
        };
        let model_names: Vec<String> = order
            .iter()
            .map(|&idx| self.graph.model(idx).name().to_string())
            .collect();
        log::info!("run={} models: {}", self.run_id, model_names.join(" -> "));
        self.record(
            "engine",
            PipelineEvent::RunStarted {
                run_id: self.run_id.clone(),
                models: model_names,
            },
        )?;

        // Sources are re-read on every run so upstream changes are picked up.
        let mut sources = Vec::new();
        for source in self.graph.sources_for(&order) {
            let relation = self.store.load_relation(source)?;
            let rows = relation.len();
            log::info!("run={} source={source}: {rows} rows", self.run_id);
            self.relations.insert(source.to_string(), relation);
            self.record(
                "source",
                PipelineEvent::SourceLoaded {
                    source: source.to_string(),
                    rows,
                },
            )?;
            sources.push((source.to_string(), rows));
        }

        let mut models = Vec::with_capacity(order.len());
        for idx in order {
            let name = self.graph.model(idx).name();
            self.record(name, PipelineEvent::ModelStarted { model: name.to_string() })?;

            let relation = {
                let ctx = ModelContext::new(&self.run_id, &self.relations);
                self.graph.model(idx).run(&ctx)?
            };
            let rows = match self.graph.model(idx).materialization() {
                Materialization::Table => self.store.materialize(name, &relation)?,
                Materialization::Ephemeral => relation.len(),
            };
            log::info!("run={} model={name}: materialized {rows} rows", self.run_id);
            self.relations.insert(name.to_string(), relation);

            self.record(
                name,
                PipelineEvent::ModelMaterialized {
                    model: name.to_string(),
                    rows,
                },
            )?;
            models.push((name.to_string(), rows));
        }

        self.record(
            "engine",
            PipelineEvent::RunCompleted {
                run_id: self.run_id.clone(),
                models_built: models.len(),
            },
        )?;

        Ok(RunSummary {
            run_id: self.run_id.clone(),
            sources,
            models,
        })
    }

    /// Run the data tests declared in the config.
    ///
    /// Relations built by this engine are tested as they are in memory;
    /// anything else is read back from the store, so `test()` also works on
    /// a fresh engine over a previously built warehouse. Results are
    /// persisted; failing tests are reported, not raised, and leave the run
    /// row with status `error`.
    pub fn test(&mut self) -> PipelineResult<ValidationReport> {
        self.begin_run()?;
        match self.validate() {
            Ok(report) => {
                let status = if report.is_success() { "success" } else { "error" };
                self.finish_run(status)?;
                Ok(report)
            }
            Err(e) => {
                log::warn!("run={} tests could not run: {e}", self.run_id);
                self.finish_run("error")?;
                Err(e)
            }
        }
    }

    fn validate(&mut self) -> PipelineResult<ValidationReport> {
        for name in validation::required_relations(&self.config.models) {
            if !self.relations.contains_key(&name) {
                let relation = self.store.load_relation(&name)?;
                self.relations.insert(name, relation);
            }
        }

        let report = validation::run_tests(
            &self.config.models,
            &self.relations,
            self.config.failure_mode,
        )?;
        self.store.insert_test_results(&self.run_id, &report.results)?;
        log::info!(
            "run={} tests: {} passed, {} failed",
            self.run_id,
            report.passed(),
            report.failed()
        );
        self.record(
            "validation",
            PipelineEvent::ValidationCompleted {
                passed: report.passed(),
                failed: report.failed(),
                stopped_early: report.stopped_early,
            },
        )?;
        Ok(report)
    }

    /// `run()` followed by `test()`.
    pub fn build_all(&mut self) -> PipelineResult<(RunSummary, ValidationReport)> {
        let summary = self.run()?;
        let report = self.test()?;
        Ok((summary, report))
    }

    pub fn events(&self) -> PipelineResult<Vec<EventLogEntry>> {
        self.store.events_for_run(&self.run_id)
    }

    fn begin_run(&self) -> PipelineResult<()> {
        self.store.insert_run(
            &self.run_id,
            env!("CARGO_PKG_VERSION"),
            &chrono::Utc::now().to_rfc3339(),
        )
    }

    fn finish_run(&self, status: &str) -> PipelineResult<()> {
        self.store
            .finish_run(&self.run_id, status, &chrono::Utc::now().to_rfc3339())
    }

    fn record(&mut self, stage: &str, event: PipelineEvent) -> PipelineResult<()> {
        let entry = EventLogEntry {
            id: None,
            run_id: self.run_id.clone(),
            seq: self.next_seq,
            stage: stage.to_string(),
            event_type: event_type_name(&event).to_string(),
            payload: serde_json::to_string(&event)?,
        };
        self.store.append_event(&entry)?;
        self.next_seq += 1;
        Ok(())
    }
}

/// Extract a stable string name from a PipelineEvent variant.
/// Used for the event_type column in event_log.
fn event_type_name(event: &PipelineEvent) -> &'static str {
    match event {
        PipelineEvent::RunStarted { .. }          => "run_started",
        PipelineEvent::SourceLoaded { .. }        => "source_loaded",
        PipelineEvent::ModelStarted { .. }        => "model_started",
        PipelineEvent::ModelMaterialized { .. }   => "model_materialized",
        PipelineEvent::ValidationCompleted { .. } => "validation_completed",
        PipelineEvent::RunCompleted { .. }        => "run_completed",
    }
}
