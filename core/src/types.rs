//! Shared primitive types used across the pipeline.

/// The natural key of a customer (`c_custkey` in the source).
pub type CustomerKey = i64;

/// A stable identifier for one pipeline invocation.
pub type RunId = String;
