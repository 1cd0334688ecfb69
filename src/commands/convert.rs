//! convert 命令处理器

use super::{CommandContext, CommandHandler};
use crate::domain::error::{DomainError, Result};
use crate::infrastructure::backup::BackupFile;
use async_trait::async_trait;
use std::path::PathBuf;

/// convert 命令
pub struct ConvertCommand {
    input: PathBuf,
    output: PathBuf,
}

impl ConvertCommand {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self { input, output }
    }
}

#[async_trait]
impl CommandHandler for ConvertCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if self.input == self.output {
            return Err(DomainError::InvalidArgument(
                "输入与输出不能是同一个文件".to_string(),
            ));
        }

        let source = BackupFile::new(&self.input);
        let target = BackupFile::new(&self.output);

        let store = source.load().await?;
        target.save(&store).await?;

        if ctx.verbose {
            println!(
                "✓ 已转换 {} 个变量: {} ({:?}) -> {} ({:?})",
                store.len(),
                source.path().display(),
                source.format(),
                target.path().display(),
                target.format()
            );
        } else {
            println!("✓ 已转换 {} 个变量到 {}", store.len(), target.path().display());
        }
        Ok(())
    }
}
