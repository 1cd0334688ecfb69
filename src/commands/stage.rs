//! stage 命令处理器
//!
//! 在备份文件中编辑一个变量：整体替换值、修改类型，或按分号列表项追加/移除/替换。
//! 不带任何编辑参数时只列出该变量的列表项。

use super::{CommandContext, CommandHandler};
use crate::application::services::ReconciliationController;
use crate::domain::error::{DomainError, Result};
use crate::domain::models::{EnvVar, Kind, Scope, VarKey};
use crate::domain::store::EnvironmentStore;
use crate::infrastructure::backup::BackupFile;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// 对单个变量的编辑
#[derive(Debug, Clone, Default)]
pub struct StageEdit {
    pub value: Option<String>,
    pub kind: Option<Kind>,
    pub push: Vec<String>,
    pub pull: Vec<String>,
    /// (下标, 新项)，下标从 0 开始
    pub replace: Option<(usize, String)>,
}

impl StageEdit {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.kind.is_none()
            && self.push.is_empty()
            && self.pull.is_empty()
            && self.replace.is_none()
    }

    /// 应用到条目上
    pub fn apply(&self, entry: &mut EnvVar) -> Result<()> {
        if let Some(value) = &self.value {
            entry.value = value.clone();
        }
        if let Some(kind) = self.kind {
            entry.kind = kind;
        }

        if self.push.is_empty() && self.pull.is_empty() && self.replace.is_none() {
            return Ok(());
        }

        let mut segments = entry.segments();
        if let Some((index, item)) = &self.replace
            && !segments.replace(*index, item)
        {
            return Err(DomainError::InvalidArgument(format!(
                "{} 只有 {} 项，无法替换第 {} 项",
                entry.name,
                segments.len(),
                index + 1
            )));
        }
        for item in &self.pull {
            if !segments.remove(item) {
                return Err(DomainError::NotFound(format!("{} 中的 '{}'", entry.name, item)));
            }
        }
        for item in &self.push {
            if !segments.push(item) {
                debug!(name = %entry.name, %item, "列表项已存在，跳过");
            }
        }
        entry.value = segments.join();
        Ok(())
    }
}

/// stage 命令
pub struct StageCommand {
    controller: Arc<ReconciliationController>,
    file: PathBuf,
    name: String,
    scope: Scope,
    edit: StageEdit,
}

impl StageCommand {
    pub fn new(
        controller: Arc<ReconciliationController>,
        file: PathBuf,
        name: String,
        scope: Scope,
        edit: StageEdit,
    ) -> Self {
        Self {
            controller,
            file,
            name,
            scope,
            edit,
        }
    }

    fn print_segments(entry: &EnvVar) {
        println!("{} ({}, {}):", entry.name, entry.scope, entry.kind);
        for (i, item) in entry.segments().items().iter().enumerate() {
            println!("  {:>3}. {}", i + 1, item);
        }
    }
}

#[async_trait]
impl CommandHandler for StageCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let file = BackupFile::new(&self.file);
        let store = match file.load().await {
            Ok(store) => store,
            Err(DomainError::FileNotFound(_)) if !self.edit.is_empty() => {
                debug!(path = %file.path().display(), "备份文件不存在，新建");
                EnvironmentStore::new()
            }
            Err(e) => return Err(e),
        };
        self.controller.replace_working(store)?;

        let key = VarKey::new(&self.name, self.scope);
        let existing = self.controller.staged_store()?.find(&key).cloned();

        if self.edit.is_empty() {
            let entry = existing.ok_or_else(|| DomainError::NotFound(key.to_string()))?;
            Self::print_segments(&entry);
            return Ok(());
        }

        let mut entry = existing
            .unwrap_or_else(|| EnvVar::new(&self.name, "", Kind::Literal, self.scope));
        self.edit.apply(&mut entry)?;
        self.controller.stage_edit(entry.clone())?;
        file.save(&self.controller.staged_store()?).await?;

        println!("✓ 已暂存 {}", entry.key());
        if ctx.verbose {
            Self::print_segments(&entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_value_and_kind() {
        let mut entry = EnvVar::user("HOME_DIR", "old");
        let edit = StageEdit {
            value: Some("%USERPROFILE%".to_string()),
            kind: Some(Kind::Expandable),
            ..StageEdit::default()
        };
        edit.apply(&mut entry).unwrap();
        assert_eq!(entry.value, "%USERPROFILE%");
        assert_eq!(entry.kind, Kind::Expandable);
    }

    #[test]
    fn test_apply_segments() {
        let mut entry = EnvVar::machine("Path", r"C:\a;;C:\b;C:\c");
        let edit = StageEdit {
            push: vec![r"C:\d".to_string(), r"c:\A".to_string()],
            pull: vec![r"C:\b".to_string()],
            replace: Some((2, r"C:\x".to_string())),
            ..StageEdit::default()
        };
        edit.apply(&mut entry).unwrap();
        assert_eq!(entry.value, r"C:\a;C:\x;C:\d");
    }

    #[test]
    fn test_pull_missing_segment_fails() {
        let mut entry = EnvVar::user("Path", r"C:\a");
        let edit = StageEdit {
            pull: vec![r"C:\zzz".to_string()],
            ..StageEdit::default()
        };
        assert!(matches!(
            edit.apply(&mut entry),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_replace_out_of_range_fails() {
        let mut entry = EnvVar::user("Path", r"C:\a");
        let edit = StageEdit {
            replace: Some((5, "x".to_string())),
            ..StageEdit::default()
        };
        assert!(edit.apply(&mut entry).is_err());
    }
}
