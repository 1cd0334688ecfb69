//! 应用服务

pub mod diff_engine;
pub mod reconciliation;

pub use diff_engine::{DiffEngine, DiffOutcome};
pub use reconciliation::{
    BatchResult, CommitRequest, Operation, ReconciliationController, Session, SessionRow,
    SessionView,
};
