//! list 命令处理器

use super::{CommandContext, CommandHandler, compile_pattern, print_rows};
use crate::application::services::ReconciliationController;
use crate::domain::error::Result;
use crate::domain::models::{OutputFormat, Scope};
use async_trait::async_trait;
use std::sync::Arc;

/// list 命令
pub struct ListCommand {
    controller: Arc<ReconciliationController>,
    scope: Option<Scope>,
    format: OutputFormat,
    filter: Option<String>,
    pattern: Option<String>,
}

impl ListCommand {
    pub fn new(
        controller: Arc<ReconciliationController>,
        scope: Option<Scope>,
        format: OutputFormat,
        filter: Option<String>,
        pattern: Option<String>,
    ) -> Self {
        Self {
            controller,
            scope,
            format,
            filter,
            pattern,
        }
    }
}

#[async_trait]
impl CommandHandler for ListCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let pattern = compile_pattern(self.pattern.as_deref())?;
        let view = self.controller.load_snapshot().await?;

        let rows = view.select(self.scope, self.filter.as_deref(), pattern.as_ref());

        print_rows(&rows, &self.format, ctx.verbose)?;
        if ctx.verbose {
            eprintln!("共 {} 个变量", rows.len());
        }
        Ok(())
    }
}
