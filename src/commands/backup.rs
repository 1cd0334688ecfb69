//! backup 命令处理器

use super::{CommandContext, CommandHandler};
use crate::application::services::ReconciliationController;
use crate::domain::error::Result;
use crate::infrastructure::backup::BackupFile;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// backup 命令
pub struct BackupCommand {
    controller: Arc<ReconciliationController>,
    path: PathBuf,
}

impl BackupCommand {
    pub fn new(controller: Arc<ReconciliationController>, path: PathBuf) -> Self {
        Self { controller, path }
    }
}

#[async_trait]
impl CommandHandler for BackupCommand {
    async fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        self.controller.load_snapshot().await?;
        let store = self.controller.staged_store()?;

        let file = BackupFile::new(&self.path);
        file.save(&store).await?;

        let machine = store.iter().filter(|e| e.scope.requires_elevation()).count();
        println!(
            "✓ 已备份 {} 个环境变量（用户级 {}，机器级 {}）到 {}",
            store.len(),
            store.len() - machine,
            machine,
            file.path().display()
        );
        Ok(())
    }
}
