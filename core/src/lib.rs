//! Customer mart pipeline: a staging model and a dimensional mart over a
//! raw customer table, with a SQLite warehouse and declarative data tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod graph;
pub mod mart;
pub mod model;
pub mod record;
pub mod rng;
pub mod seed;
pub mod staging;
pub mod store;
pub mod types;
pub mod validation;
