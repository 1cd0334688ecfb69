//! CLI 参数定义

use crate::domain::error::{DomainError, Result};
use crate::domain::models::{Kind, Scope};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EnvReg - Windows 注册表环境变量备份与差异同步工具
#[derive(Parser)]
#[command(
    name = "envreg",
    version,
    about = "Windows 注册表环境变量备份与差异同步工具",
    long_about = "备份用户级/机器级环境变量，编辑备份文件，与当前系统比较差异后按状态安全地写回注册表"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 只读取一次系统，所有写入/删除只作用于内存
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// 配置文件路径（默认 ~/.envreg/config.toml）
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 列出当前系统环境变量
    List {
        /// 作用域 (user/machine)
        #[arg(short, long)]
        scope: Option<String>,
        /// 输出格式 (env/json)
        #[arg(short, long, default_value = "env")]
        format: String,
        /// 按名称、值、作用域过滤（不区分大小写）
        #[arg(long)]
        filter: Option<String>,
        /// 按名称正则匹配
        #[arg(long = "match", value_name = "REGEX")]
        pattern: Option<String>,
    },

    /// 备份当前系统环境变量
    Backup {
        /// 输出文件（.json 为 JSON，其余为 YAML）
        file: Option<PathBuf>,
    },

    /// 转换备份文件格式
    Convert {
        /// 输入文件
        input: PathBuf,
        /// 输出文件
        output: PathBuf,
    },

    /// 比较备份文件与当前系统
    Diff {
        /// 备份文件
        file: PathBuf,
        /// 按名称、值、作用域过滤（不区分大小写）
        #[arg(long)]
        filter: Option<String>,
        /// 按名称正则匹配
        #[arg(long = "match", value_name = "REGEX")]
        pattern: Option<String>,
        /// 输出格式 (env/json)
        #[arg(short, long, default_value = "env")]
        format: String,
    },

    /// 编辑备份文件中的一个变量（不带编辑参数时列出分号列表项）
    Stage {
        /// 备份文件
        file: PathBuf,
        /// 变量名称
        name: String,
        /// 作用域 (user/machine)
        #[arg(short, long, default_value = "user")]
        scope: String,
        /// 新的值
        #[arg(long, conflicts_with_all = ["push", "pull", "replace"])]
        value: Option<String>,
        /// 值类型 (String/ExpandString)
        #[arg(short, long)]
        kind: Option<String>,
        /// 追加分号列表项
        #[arg(long, value_name = "SEGMENT")]
        push: Vec<String>,
        /// 移除分号列表项
        #[arg(long, value_name = "SEGMENT")]
        pull: Vec<String>,
        /// 替换第 N 个分号列表项（从 1 开始）
        #[arg(long, value_name = "N=SEGMENT")]
        replace: Option<String>,
    },

    /// 写入新增/修改的变量
    Write {
        /// 备份文件
        file: PathBuf,
        /// 变量 (NAME 或 NAME@user / NAME@machine)
        #[arg(required = true)]
        keys: Vec<String>,
        /// 不比较差异直接写入
        #[arg(long, requires = "yes")]
        skip_diff: bool,
        /// 确认跳过差异比较
        #[arg(short, long)]
        yes: bool,
    },

    /// 写入编辑过的变量
    Modify {
        /// 备份文件
        file: PathBuf,
        /// 变量 (NAME 或 NAME@user / NAME@machine)
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// 从系统中删除变量
    Delete {
        /// 备份文件
        file: PathBuf,
        /// 变量 (NAME 或 NAME@user / NAME@machine)
        #[arg(required = true)]
        keys: Vec<String>,
        /// 不比较差异直接删除
        #[arg(long, requires = "yes")]
        skip_diff: bool,
        /// 确认跳过差异比较
        #[arg(short, long)]
        yes: bool,
    },

    /// 写入所有新增/修改的变量
    Apply {
        /// 备份文件
        file: PathBuf,
    },

    /// 把备份文件中的变量恢复为系统当前值
    Restore {
        /// 备份文件
        file: PathBuf,
        /// 变量 (NAME 或 NAME@user / NAME@machine)
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// 显示运行状态
    Status,
}

/// 解析变量参数: `NAME` 或 `NAME@user` / `NAME@machine`
pub fn parse_key_spec(spec: &str) -> Result<(String, Option<Scope>)> {
    let spec = spec.trim();
    let (name, scope) = match spec.rsplit_once('@') {
        Some((name, scope)) => {
            let scope = Scope::parse(scope)
                .ok_or_else(|| DomainError::InvalidArgument(format!("无效的作用域: {}", scope)))?;
            (name, Some(scope))
        }
        None => (spec, None),
    };

    if name.is_empty() {
        return Err(DomainError::InvalidArgument(format!("无效的变量: {}", spec)));
    }
    Ok((name.to_string(), scope))
}

/// 解析列表项替换参数: `N=SEGMENT`（N 从 1 开始）
pub fn parse_replacement(spec: &str) -> Result<(usize, String)> {
    let invalid = || DomainError::InvalidArgument(format!("替换参数格式应为 N=SEGMENT: {}", spec));
    let (index, item) = spec.split_once('=').ok_or_else(invalid)?;
    let index: usize = index.trim().parse().map_err(|_| invalid())?;
    if index == 0 || item.trim().is_empty() {
        return Err(invalid());
    }
    Ok((index - 1, item.to_string()))
}

/// 解析作用域参数
pub fn parse_scope(scope: &str) -> Result<Scope> {
    Scope::parse(scope).ok_or_else(|| {
        DomainError::InvalidArgument(format!("作用域必须是 'user' 或 'machine': {}", scope))
    })
}

/// 解析值类型参数
pub fn parse_kind(kind: &str) -> Result<Kind> {
    Kind::parse(kind).ok_or_else(|| {
        DomainError::InvalidArgument(format!("值类型必须是 'String' 或 'ExpandString': {}", kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_spec() {
        assert_eq!(parse_key_spec("PATH").unwrap(), ("PATH".to_string(), None));
        assert_eq!(
            parse_key_spec("Path@machine").unwrap(),
            ("Path".to_string(), Some(Scope::Machine))
        );
        assert_eq!(
            parse_key_spec("TEMP@User").unwrap(),
            ("TEMP".to_string(), Some(Scope::User))
        );
        assert!(parse_key_spec("X@nowhere").is_err());
        assert!(parse_key_spec("@user").is_err());
    }

    #[test]
    fn test_skip_diff_requires_yes() {
        let parsed = Cli::try_parse_from(["envreg", "write", "env.yaml", "A", "--skip-diff"]);
        assert!(parsed.is_err());

        let parsed =
            Cli::try_parse_from(["envreg", "delete", "env.yaml", "A", "--skip-diff", "--yes"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_stage_value_conflicts_with_segments() {
        let parsed = Cli::try_parse_from([
            "envreg", "stage", "env.yaml", "PATH", "--value", "x", "--push", "y",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_replacement() {
        assert_eq!(
            parse_replacement(r"2=C:\tools").unwrap(),
            (1, r"C:\tools".to_string())
        );
        assert!(parse_replacement("0=x").is_err());
        assert!(parse_replacement("x").is_err());
        assert!(parse_replacement("1=").is_err());
    }

    #[test]
    fn test_parse_scope_and_kind() {
        assert_eq!(parse_scope("machine").unwrap(), Scope::Machine);
        assert!(parse_scope("project").is_err());
        assert_eq!(parse_kind("ExpandString").unwrap(), Kind::Expandable);
        assert!(parse_kind("dword").is_err());
    }
}
