//! 应用配置
//!
//! 读取 `~/.envreg/config.toml`（或 `--config` 指定的文件），命令行参数覆盖文件中的值。
//!
//! ```toml
//! verbose = false
//! dry_run = false
//! backup_dir = 'D:\backups'
//! default_format = "yaml"
//! log_filter = "envreg=info"
//! ```

use crate::domain::error::{DomainError, Result};
use crate::infrastructure::backup::BackupFormat;
use crate::infrastructure::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 应用程序配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub verbose: bool,
    /// 只读取一次系统，提交写入内存
    pub dry_run: bool,
    /// `backup` 未指定文件时的输出目录
    pub backup_dir: Option<PathBuf>,
    /// `backup` 未指定文件时的格式: yaml / json
    pub default_format: String,
    /// tracing 过滤规则，RUST_LOG 优先
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            backup_dir: None,
            default_format: "yaml".to_string(),
            log_filter: None,
        }
    }
}

impl AppConfig {
    /// 从 TOML 文本解析
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.backup_format()?;
        Ok(config)
    }

    /// 读取配置文件
    ///
    /// 显式指定的文件必须存在；默认位置的文件不存在时使用默认值
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(DomainError::FileNotFound(path.to_path_buf()));
                }
                path.to_path_buf()
            }
            None => match paths::get_config_file() {
                Ok(path) if path.exists() => path,
                _ => {
                    debug!("未找到配置文件，使用默认配置");
                    return Ok(Self::default());
                }
            },
        };

        let text = tokio::fs::read_to_string(&path).await?;
        let config = Self::from_toml(&text)
            .map_err(|e| DomainError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "已加载配置文件");
        Ok(config)
    }

    /// 命令行参数覆盖
    #[must_use]
    pub fn with_overrides(mut self, verbose: bool, dry_run: bool) -> Self {
        self.verbose |= verbose;
        self.dry_run |= dry_run;
        self
    }

    pub fn backup_format(&self) -> Result<BackupFormat> {
        BackupFormat::parse(&self.default_format)
    }

    /// 日志过滤规则: 配置值，否则按 verbose 选择 debug / warn
    #[must_use]
    pub fn log_directive(&self) -> String {
        match &self.log_filter {
            Some(filter) if !filter.trim().is_empty() => filter.clone(),
            _ if self.verbose => "debug".to_string(),
            _ => "warn".to_string(),
        }
    }
}
