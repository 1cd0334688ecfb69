//! status 命令处理器

use super::{CommandContext, CommandHandler};
use crate::config::AppConfig;
use crate::domain::error::{DomainError, Result};
use crate::infrastructure::paths;
use crate::infrastructure::privilege::SystemInfo;
use async_trait::async_trait;
use std::path::PathBuf;

/// status 命令
pub struct StatusCommand {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl StatusCommand {
    pub fn new(config: AppConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }
}

#[async_trait]
impl CommandHandler for StatusCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let info = tokio::task::spawn_blocking(SystemInfo::collect)
            .await
            .map_err(|e| DomainError::Io(e.to_string()))?;
        println!("{}", info);

        if !info.elevated {
            println!("⚠️  未以管理员身份运行：机器级变量只能读取，不能写入或删除");
        }
        if ctx.dry_run {
            println!("模式: dry-run（提交只作用于内存）");
        }

        let config_file = match &self.config_path {
            Some(path) => path.clone(),
            None => paths::get_config_file()?,
        };
        let status = if config_file.exists() { "存在" } else { "不存在，使用默认配置" };
        println!("配置文件: {} [{}]", config_file.display(), status);

        if ctx.verbose {
            println!("\n当前配置:");
            println!("  dry_run = {}", self.config.dry_run);
            println!("  default_format = {}", self.config.default_format);
            match &self.config.backup_dir {
                Some(dir) => println!("  backup_dir = {}", dir.display()),
                None => println!("  backup_dir = (当前目录)"),
            }
            println!("  log_filter = {}", self.config.log_directive());
        }
        Ok(())
    }
}
