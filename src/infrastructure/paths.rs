//! 路径管理工具

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// 获取配置目录
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".envreg"))
        .ok_or_else(|| DomainError::Config("无法确定主目录".to_string()))
}

/// 默认配置文件路径
pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// 默认备份文件名: env_backup_YYYYMMDD_HHMMSS.yaml
#[must_use]
pub fn backup_file_name(at: DateTime<Local>) -> String {
    format!("env_backup_{}.yaml", at.format("%Y%m%d_%H%M%S"))
}

/// 默认备份路径；未配置目录时使用当前目录
pub fn default_backup_path(backup_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match backup_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    Ok(dir.join(backup_file_name(Local::now())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(backup_file_name(at), "env_backup_20240309_070501.yaml");
    }

    #[test]
    fn test_default_backup_path_uses_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_backup_path(Some(dir.path())).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.extension().is_some_and(|e| e == "yaml"));
    }

    #[test]
    fn test_config_file_under_config_dir() {
        if let (Ok(dir), Ok(file)) = (get_config_dir(), get_config_file()) {
            assert_eq!(file.parent().unwrap(), dir);
        }
    }
}
