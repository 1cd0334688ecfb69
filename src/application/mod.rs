//! Application Layer - 应用服务
//!
//! 包含：
//! - diff_engine: 工作集与系统快照的差异比较
//! - reconciliation: 会话状态与提交流程

pub mod services;
