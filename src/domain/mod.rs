//! Domain Layer - 核心业务模型
//!
//! 包含：
//! - models: 领域实体（变量、作用域、差异分类）
//! - store: 变量集合与系统快照
//! - repositories: 外部协作接口（输出端口）
//! - error: 领域错误类型

pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::{DomainError, Rejection, Result};
pub use models::{Classification, DiffClassification, EnvVar, Kind, OutputFormat, Scope, VarKey};
pub use repositories::{BackupCodec, EntryOutcome, SystemEnvironmentGateway};
pub use store::{EnvironmentStore, SystemSnapshot};
