//! 命令处理器
//!
//! 每个命令一个模块，实现 CommandHandler trait

use crate::application::services::{ReconciliationController, SessionRow};
use crate::cli::parse_key_spec;
use crate::domain::error::{DomainError, Result};
use crate::domain::models::{OutputFormat, VarKey};
use crate::infrastructure::backup::BackupFile;
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;

pub mod backup;
pub mod commit;
pub mod convert;
pub mod diff;
pub mod list;
pub mod restore;
pub mod stage;
pub mod status;

/// 命令上下文
#[derive(Debug, Default)]
pub struct CommandContext {
    pub verbose: bool,
    pub dry_run: bool,
}

/// 命令处理器 trait
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// 执行命令
    async fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// 读取备份文件作为暂存集；读取失败时工作集保持不变
pub(crate) async fn load_working(
    controller: &ReconciliationController,
    file: &BackupFile,
) -> Result<usize> {
    let store = file.load().await?;
    let count = store.len();
    controller.replace_working(store)?;
    Ok(count)
}

/// 把 `NAME` / `NAME@scope` 参数解析为工作集中的键（去重，按名称排序）
pub(crate) fn resolve_keys(
    controller: &ReconciliationController,
    specs: &[String],
) -> Result<Vec<VarKey>> {
    let mut keys = BTreeSet::new();
    for spec in specs {
        let (name, scope) = parse_key_spec(spec)?;
        keys.extend(controller.resolve(&name, scope)?);
    }
    Ok(keys.into_iter().collect())
}

/// 编译 `--match` 正则
pub(crate) fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|p| {
            Regex::new(&format!("(?i){}", p))
                .map_err(|e| DomainError::InvalidArgument(format!("无效的正则表达式: {}", e)))
        })
        .transpose()
}

/// 打印工作集行
pub(crate) fn print_rows(rows: &[&SessionRow], format: &OutputFormat, verbose: bool) -> Result<()> {
    match format {
        OutputFormat::Env => {
            for row in rows {
                let marker = row.classification.map_or('?', |c| c.marker());
                let entry = &row.entry;
                if verbose {
                    println!(
                        "{} [{}] {}={} ({})",
                        marker, entry.scope, entry.name, entry.value, entry.kind
                    );
                } else {
                    println!("{} [{}] {}={}", marker, entry.scope, entry.name, entry.value);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
    }
    Ok(())
}
