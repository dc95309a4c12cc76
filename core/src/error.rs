use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model '{name}' not found")]
    ModelNotFound { name: String },

    #[error("Model '{name}' is already registered")]
    DuplicateModel { name: String },

    #[error("Model '{model}' depends on unknown relation '{dependency}'")]
    UnknownDependency { model: String, dependency: String },

    #[error("Dependency cycle between models: {}", .models.join(", "))]
    DependencyCycle { models: Vec<String> },

    #[error("Relation '{name}' has not been materialized")]
    RelationMissing { name: String },

    #[error("Relation '{name}' holds {actual} rows, expected {expected} rows")]
    RelationKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("{failed} of {total} data tests failed")]
    ValidationFailed { failed: usize, total: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
