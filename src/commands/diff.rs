//! diff 命令处理器

use super::{CommandContext, CommandHandler, compile_pattern, load_working, print_rows};
use crate::application::services::ReconciliationController;
use crate::domain::error::Result;
use crate::domain::models::{Classification, OutputFormat};
use crate::infrastructure::backup::BackupFile;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// diff 命令
pub struct DiffCommand {
    controller: Arc<ReconciliationController>,
    file: PathBuf,
    filter: Option<String>,
    pattern: Option<String>,
    format: OutputFormat,
}

impl DiffCommand {
    pub fn new(
        controller: Arc<ReconciliationController>,
        file: PathBuf,
        filter: Option<String>,
        pattern: Option<String>,
        format: OutputFormat,
    ) -> Self {
        Self {
            controller,
            file,
            filter,
            pattern,
            format,
        }
    }
}

#[async_trait]
impl CommandHandler for DiffCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let pattern = compile_pattern(self.pattern.as_deref())?;
        load_working(&self.controller, &BackupFile::new(&self.file)).await?;
        let summary = self.controller.compare_with_system().await?;

        let view = self.controller.view()?;
        let rows = view.select(None, self.filter.as_deref(), pattern.as_ref());
        print_rows(&rows, &self.format, ctx.verbose)?;

        if self.format == OutputFormat::Env {
            if ctx.verbose {
                for row in rows
                    .iter()
                    .filter(|r| r.classification == Some(Classification::Modified))
                {
                    let detail = self.controller.detail(&row.entry.key())?;
                    println!("\n~ {}", detail.key);
                    if let Some(staged) = &detail.staged {
                        println!("  备份: {} ({})", staged.value, staged.kind);
                    }
                    if let Some(system) = &detail.system {
                        println!("  系统: {} ({})", system.value, system.kind);
                    }
                }
            }
            println!("\n{}", summary);
        }
        Ok(())
    }
}
