//! write / modify / delete / apply 命令处理器
//!
//! 读取备份文件作为暂存集，与系统比较差异后按操作提交。

use super::{CommandContext, CommandHandler, load_working, resolve_keys};
use crate::application::services::{BatchResult, CommitRequest, Operation, ReconciliationController};
use crate::domain::error::{DomainError, Result};
use crate::infrastructure::backup::BackupFile;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// 提交命令
pub struct CommitCommand {
    controller: Arc<ReconciliationController>,
    file: PathBuf,
    operation: Operation,
    keys: Vec<String>,
    elevated: bool,
    skip_diff: bool,
}

impl CommitCommand {
    pub fn new(
        controller: Arc<ReconciliationController>,
        file: PathBuf,
        operation: Operation,
        keys: Vec<String>,
        elevated: bool,
    ) -> Self {
        Self {
            controller,
            file,
            operation,
            keys,
            elevated,
            skip_diff: false,
        }
    }

    /// 跳过差异比较（仅 write / delete 允许）
    #[must_use]
    pub fn skip_diff(mut self, skip: bool) -> Self {
        self.skip_diff = skip;
        self
    }

    fn request(&self) -> Result<CommitRequest> {
        let request = match self.operation {
            Operation::ApplyAll => CommitRequest::apply_all(self.elevated),
            operation => CommitRequest::new(
                operation,
                resolve_keys(&self.controller, &self.keys)?,
                self.elevated,
            ),
        };
        Ok(if self.skip_diff {
            request.confirm_without_diff()
        } else {
            request
        })
    }
}

fn print_result(operation: Operation, result: &BatchResult, ctx: &CommandContext) {
    let suffix = if ctx.dry_run { "（dry-run，未修改注册表）" } else { "" };
    println!(
        "✓ {}: 成功 {} 个，失败 {} 个{}",
        operation,
        result.succeeded.len(),
        result.failed.len(),
        suffix
    );

    if ctx.verbose {
        for key in &result.succeeded {
            println!("  ✓ {}", key);
        }
    }
    for (key, reason) in &result.failed {
        println!("  ✗ {}: {}", key, reason);
    }
    if !result.refreshed && !result.succeeded.is_empty() {
        println!("⚠️  提交后读取系统失败，请重新运行 diff 确认状态");
    }
}

#[async_trait]
impl CommandHandler for CommitCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if self.skip_diff && !self.operation.allows_unverified() {
            return Err(DomainError::InvalidArgument(format!(
                "{} 操作不能跳过差异比较",
                self.operation
            )));
        }

        load_working(&self.controller, &BackupFile::new(&self.file)).await?;
        if self.skip_diff {
            debug!(operation = %self.operation, "跳过差异比较");
        } else {
            let summary = self.controller.compare_with_system().await?;
            if ctx.verbose {
                println!("差异: {}", summary);
            }
        }

        let result = self.controller.commit(self.request()?).await?;
        if result.total() == 0 {
            println!("没有需要提交的变量");
            return Ok(());
        }
        print_result(self.operation, &result, ctx);

        if result.is_complete_success() {
            Ok(())
        } else {
            Err(DomainError::Gateway(format!(
                "{} 个变量提交失败",
                result.failed.len()
            )))
        }
    }
}
