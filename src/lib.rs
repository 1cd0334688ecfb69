//! EnvReg - Windows 注册表环境变量备份与差异同步工具
//!
//! 分层结构：领域模型与端口、差异比较与会话协调、注册表/备份文件实现、命令行

// 领域层
pub mod domain;

// 应用层
pub mod application;

// 基础设施层
pub mod infrastructure;

// 配置
pub mod config;

// 命令层
pub mod commands;

// CLI 定义
pub mod cli;

// 应用程序容器
pub mod app;

// 重新导出常用类型
pub use domain::{DomainError, EnvVar, Kind, Result, Scope, VarKey};
