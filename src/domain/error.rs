//! 领域层错误类型

use crate::domain::models::{Classification, VarKey};
use miette::Diagnostic;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

/// 状态校验失败的单个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub key: VarKey,
    pub classification: Classification,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.key.name, self.key.scope, self.classification)
    }
}

/// 领域层错误类型
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum DomainError {
    #[error("状态校验失败: {operation} 操作不能应用于 {} 个变量", .rejected.len())]
    #[diagnostic(
        code(envreg::validation),
        help("写入/变更仅适用于新增或修改状态；删除仅适用于系统中已存在的变量")
    )]
    Validation {
        operation: String,
        rejected: Vec<Rejection>,
    },

    #[error("尚未进行差异比较: {operation} 操作需要先比较系统环境变量")]
    #[diagnostic(
        code(envreg::diff_required),
        help("先运行 diff，或对写入/删除使用 --skip-diff --yes 跳过校验")
    )]
    DiffRequired {
        operation: String,
        pending: Vec<VarKey>,
    },

    #[error("权限不足: 包含 {machine_entries} 个系统变量，需要管理员权限")]
    #[diagnostic(code(envreg::privilege), help("以管理员身份运行后重试"))]
    InsufficientPrivilege { machine_entries: usize },

    #[error("注册表访问失败: {0}")]
    #[diagnostic(code(envreg::gateway))]
    Gateway(String),

    #[error("备份文件格式错误: {0}")]
    #[diagnostic(code(envreg::format))]
    Format(String),

    #[error("已有操作正在进行，请稍后重试")]
    #[diagnostic(code(envreg::busy))]
    Busy,

    #[error("变量未找到: {0}")]
    #[diagnostic(code(envreg::not_found), help("使用 'envreg diff <FILE>' 查看工作集中的变量"))]
    NotFound(String),

    #[error("存储错误: {0}")]
    #[diagnostic(code(envreg::storage))]
    Storage(String),

    #[error("IO 错误: {0}")]
    #[diagnostic(code(envreg::io))]
    Io(String),

    #[error("权限不足: {0}")]
    #[diagnostic(code(envreg::permission_denied))]
    PermissionDenied(String),

    #[error("文件不存在: {0}")]
    #[diagnostic(code(envreg::file_not_found))]
    FileNotFound(PathBuf),

    #[error("序列化错误: {0}")]
    #[diagnostic(code(envreg::serialization))]
    Serialization(String),

    #[error("无效参数: {0}")]
    #[diagnostic(code(envreg::invalid_argument))]
    InvalidArgument(String),

    #[error("配置错误: {0}")]
    #[diagnostic(code(envreg::config))]
    Config(String),
}

impl DomainError {
    /// 报告错误，支持详细/安静模式
    /// verbose = true: 详细错误链及结构化明细
    /// verbose = false: 关键信息
    pub fn report(&self, verbose: bool) {
        eprintln!("❌ 错误: {}", self);

        match self {
            DomainError::Validation { rejected, .. } => {
                for item in rejected {
                    eprintln!("  - {}", item);
                }
            }
            DomainError::DiffRequired { pending, .. } if !pending.is_empty() => {
                eprintln!("  以下变量编辑后尚未重新比较:");
                for key in pending {
                    eprintln!("  - {}", key);
                }
            }
            _ => {}
        }

        if verbose {
            if let Some(help) = self.help() {
                eprintln!("  提示: {}", help);
            }
            let mut current = self.source();
            while let Some(next) = current {
                eprintln!("  └─ 原因: {}", next);
                current = next.source();
            }
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => DomainError::PermissionDenied(err.to_string()),
            _ => DomainError::Io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            DomainError::Format(err.to_string())
        } else {
            DomainError::Serialization(err.to_string())
        }
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        DomainError::Format(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}
