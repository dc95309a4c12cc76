//! Model registry and execution order.
//!
//! RULES:
//!   - A dependency is either a declared source or a registered model.
//!   - Execution order is topological; among models that are ready at the
//!     same time, registration order wins. Same graph, same order.

use crate::{
    error::{PipelineError, PipelineResult},
    model::Model,
};
use std::collections::{BTreeSet, HashSet};

#[derive(Default)]
pub struct ModelGraph {
    sources: Vec<&'static str>,
    models: Vec<Box<dyn Model>>,
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an external relation models may depend on.
    pub fn add_source(&mut self, name: &'static str) -> PipelineResult<()> {
        if self.contains(name) {
            return Err(PipelineError::DuplicateModel { name: name.to_string() });
        }
        self.sources.push(name);
        Ok(())
    }

    pub fn register(&mut self, model: Box<dyn Model>) -> PipelineResult<()> {
        if self.contains(model.name()) {
            return Err(PipelineError::DuplicateModel {
                name: model.name().to_string(),
            });
        }
        self.models.push(model);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.is_source(name) || self.index_of(name).is_some()
    }

    pub fn is_source(&self, name: &str) -> bool {
        self.sources.contains(&name)
    }

    pub fn model(&self, idx: usize) -> &dyn Model {
        self.models[idx].as_ref()
    }

    pub fn model_names(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.models.iter().position(|m| m.name() == name)
    }

    /// Every registered model, dependencies first (Kahn's algorithm).
    pub fn execution_order(&self) -> PipelineResult<Vec<usize>> {
        let n = self.models.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (idx, model) in self.models.iter().enumerate() {
            for &dep in model.depends_on() {
                if self.is_source(dep) {
                    continue;
                }
                let upstream = self.index_of(dep).ok_or_else(|| {
                    PipelineError::UnknownDependency {
                        model: model.name().to_string(),
                        dependency: dep.to_string(),
                    }
                })?;
                indegree[idx] += 1;
                dependents[upstream].push(idx);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(idx) = ready.pop_first() {
            order.push(idx);
            for &next in &dependents[idx] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() < n {
            let models = (0..n)
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.models[i].name().to_string())
                .collect();
            return Err(PipelineError::DependencyCycle { models });
        }
        Ok(order)
    }

    /// `target` and all of its upstream models, in execution order.
    pub fn select(&self, target: &str) -> PipelineResult<Vec<usize>> {
        let root = self.index_of(target).ok_or_else(|| PipelineError::ModelNotFound {
            name: target.to_string(),
        })?;

        let mut wanted = HashSet::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if !wanted.insert(idx) {
                continue;
            }
            for &dep in self.models[idx].depends_on() {
                if let Some(upstream) = self.index_of(dep) {
                    stack.push(upstream);
                }
            }
        }

        Ok(self
            .execution_order()?
            .into_iter()
            .filter(|idx| wanted.contains(idx))
            .collect())
    }

    /// Sources read by the given models, deduplicated, in first-use order.
    pub fn sources_for(&self, order: &[usize]) -> Vec<&'static str> {
        let mut sources = Vec::new();
        for &idx in order {
            for &dep in self.models[idx].depends_on() {
                if self.is_source(dep) && !sources.contains(&dep) {
                    sources.push(dep);
                }
            }
        }
        sources
    }
}
