//! 领域实体

pub mod diff;
pub mod env_var;

pub use diff::{Classification, DiffClassification, DiffDetail, DiffSummary};
pub use env_var::{EnvVar, Kind, OutputFormat, Scope, ValueSegments, VarKey};
