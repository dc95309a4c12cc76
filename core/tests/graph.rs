//! Model graph ordering, selection and error cases.

use custmart_core::{
    config::{RankMethod, TierThresholds},
    error::{PipelineError, PipelineResult},
    graph::ModelGraph,
    mart::MartModel,
    model::{Model, ModelContext, Relation, RAW_CUSTOMER},
    staging::StagingModel,
};

/// A model that only declares dependencies.
struct Stub {
    name: &'static str,
    deps: &'static [&'static str],
}

impl Model for Stub {
    fn name(&self) -> &'static str {
        self.name
    }

    fn depends_on(&self) -> &'static [&'static str] {
        self.deps
    }

    fn run(&self, _ctx: &ModelContext<'_>) -> PipelineResult<Relation> {
        Ok(Relation::Staged(Vec::new()))
    }
}

fn stub(name: &'static str, deps: &'static [&'static str]) -> Box<dyn Model> {
    Box::new(Stub { name, deps })
}

fn names(graph: &ModelGraph, order: &[usize]) -> Vec<&'static str> {
    order.iter().map(|&i| graph.model(i).name()).collect()
}

fn pipeline_graph() -> ModelGraph {
    let mut graph = ModelGraph::new();
    graph.add_source(RAW_CUSTOMER).unwrap();
    // Registered downstream-first on purpose.
    graph
        .register(Box::new(MartModel::new(RankMethod::Dense, TierThresholds::default())))
        .unwrap();
    graph.register(Box::new(StagingModel)).unwrap();
    graph
}

#[test]
fn staging_runs_before_mart_regardless_of_registration() {
    let graph = pipeline_graph();
    let order = graph.execution_order().unwrap();
    assert_eq!(names(&graph, &order), vec!["stg_customers", "dim_customers"]);
    assert_eq!(graph.sources_for(&order), vec![RAW_CUSTOMER]);
}

#[test]
fn independent_models_keep_registration_order() {
    let mut graph = ModelGraph::new();
    graph.add_source("src").unwrap();
    graph.register(stub("b", &["src"])).unwrap();
    graph.register(stub("a", &["src"])).unwrap();
    graph.register(stub("c", &["a", "b"])).unwrap();

    let order = graph.execution_order().unwrap();
    assert_eq!(names(&graph, &order), vec!["b", "a", "c"]);
}

#[test]
fn select_includes_only_upstream_models() {
    let mut graph = ModelGraph::new();
    graph.add_source("src").unwrap();
    graph.register(stub("base", &["src"])).unwrap();
    graph.register(stub("left", &["base"])).unwrap();
    graph.register(stub("right", &["base"])).unwrap();

    let order = graph.select("left").unwrap();
    assert_eq!(names(&graph, &order), vec!["base", "left"]);

    let order = graph.select("base").unwrap();
    assert_eq!(names(&graph, &order), vec!["base"]);
}

#[test]
fn selecting_an_unknown_model_fails() {
    let graph = pipeline_graph();
    let err = graph.select("fct_orders").unwrap_err();
    assert!(matches!(err, PipelineError::ModelNotFound { name } if name == "fct_orders"));
}

#[test]
fn unknown_dependency_is_reported() {
    let mut graph = ModelGraph::new();
    graph.register(stub("orphan", &["missing_source"])).unwrap();

    let err = graph.execution_order().unwrap_err();
    match err {
        PipelineError::UnknownDependency { model, dependency } => {
            assert_eq!(model, "orphan");
            assert_eq!(dependency, "missing_source");
        }
        other => panic!("expected UnknownDependency, got {other:?}"),
    }
}

#[test]
fn cycles_are_detected() {
    let mut graph = ModelGraph::new();
    graph.add_source("src").unwrap();
    graph.register(stub("root", &["src"])).unwrap();
    graph.register(stub("x", &["root", "y"])).unwrap();
    graph.register(stub("y", &["x"])).unwrap();

    let err = graph.execution_order().unwrap_err();
    match err {
        PipelineError::DependencyCycle { models } => assert_eq!(models, vec!["x", "y"]),
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let mut graph = pipeline_graph();
    let err = graph.register(Box::new(StagingModel)).unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateModel { .. }));

    let err = graph.register(stub(RAW_CUSTOMER, &[])).unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateModel { .. }));
}
