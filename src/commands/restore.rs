//! restore 命令处理器

use super::{CommandContext, CommandHandler, load_working, resolve_keys};
use crate::application::services::ReconciliationController;
use crate::domain::error::Result;
use crate::infrastructure::backup::BackupFile;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// restore 命令：把备份中的变量恢复为系统当前值，并写回备份文件
pub struct RestoreCommand {
    controller: Arc<ReconciliationController>,
    file: PathBuf,
    keys: Vec<String>,
}

impl RestoreCommand {
    pub fn new(controller: Arc<ReconciliationController>, file: PathBuf, keys: Vec<String>) -> Self {
        Self {
            controller,
            file,
            keys,
        }
    }
}

#[async_trait]
impl CommandHandler for RestoreCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let file = BackupFile::new(&self.file);
        load_working(&self.controller, &file).await?;
        self.controller.compare_with_system().await?;

        let keys = resolve_keys(&self.controller, &self.keys)?;
        let restored = self.controller.restore(&keys)?;
        file.save(&self.controller.staged_store()?).await?;

        println!("✓ 已恢复 {} 个变量为系统值", restored);
        if ctx.verbose {
            for key in &keys {
                println!("  {}", key);
            }
        }
        Ok(())
    }
}
