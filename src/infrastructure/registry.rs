//! Windows 注册表网关
//!
//! - 用户级: HKEY_CURRENT_USER\Environment
//! - 机器级: HKEY_LOCAL_MACHINE\SYSTEM\CurrentControlSet\Control\Session Manager\Environment
//!
//! 读取时保留未展开的原始值（REG_EXPAND_SZ 不做 %VAR% 展开）。
//! 其他平台上所有操作都返回 `DomainError::Gateway`。

use crate::domain::error::{DomainError, Result};
use crate::domain::models::{EnvVar, Scope, VarKey};
use crate::domain::repositories::{EntryOutcome, SystemEnvironmentGateway};
use async_trait::async_trait;
use tracing::{debug, info};

pub const USER_ENV_PATH: &str = "Environment";
pub const MACHINE_ENV_PATH: &str = "SYSTEM\\CurrentControlSet\\Control\\Session Manager\\Environment";

/// 作用域对应的注册表路径
#[must_use]
pub fn registry_path(scope: Scope) -> &'static str {
    match scope {
        Scope::User => USER_ENV_PATH,
        Scope::Machine => MACHINE_ENV_PATH,
    }
}

/// 注册表网关
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryGateway;

impl RegistryGateway {
    pub fn new() -> Self {
        Self
    }
}

fn join_error(e: tokio::task::JoinError) -> DomainError {
    DomainError::Gateway(format!("注册表任务异常: {}", e))
}

#[async_trait]
impl SystemEnvironmentGateway for RegistryGateway {
    async fn read_all(&self) -> Result<Vec<EnvVar>> {
        let mut entries = tokio::task::spawn_blocking(|| {
            let mut entries = platform::read_scope(Scope::User)?;
            entries.extend(platform::read_scope(Scope::Machine)?);
            Ok::<_, DomainError>(entries)
        })
        .await
        .map_err(join_error)??;

        entries.sort_by_key(|e| (e.name.to_lowercase(), e.scope));
        debug!(count = entries.len(), "读取注册表环境变量");
        Ok(entries)
    }

    async fn write_batch(&self, entries: &[EnvVar]) -> Vec<EntryOutcome> {
        let owned = entries.to_vec();
        let keys: Vec<VarKey> = entries.iter().map(EnvVar::key).collect();

        let joined = tokio::task::spawn_blocking(move || {
            owned
                .iter()
                .map(|entry| EntryOutcome {
                    key: entry.key(),
                    result: platform::write_value(entry),
                })
                .collect::<Vec<_>>()
        })
        .await;

        let outcomes = collect_outcomes(joined, keys);
        info!(
            total = outcomes.len(),
            succeeded = outcomes.iter().filter(|o| o.is_ok()).count(),
            "注册表写入完成"
        );
        outcomes
    }

    async fn delete_batch(&self, keys: &[VarKey]) -> Vec<EntryOutcome> {
        let owned = keys.to_vec();

        let joined = tokio::task::spawn_blocking(move || {
            owned
                .iter()
                .map(|key| EntryOutcome {
                    key: key.clone(),
                    result: platform::delete_value(key),
                })
                .collect::<Vec<_>>()
        })
        .await;

        let outcomes = collect_outcomes(joined, keys.to_vec());
        info!(
            total = outcomes.len(),
            succeeded = outcomes.iter().filter(|o| o.is_ok()).count(),
            "注册表删除完成"
        );
        outcomes
    }
}

/// 阻塞任务异常时，批次中每个条目都记为失败
fn collect_outcomes(
    joined: std::result::Result<Vec<EntryOutcome>, tokio::task::JoinError>,
    keys: Vec<VarKey>,
) -> Vec<EntryOutcome> {
    match joined {
        Ok(outcomes) => outcomes,
        Err(e) => {
            let error = join_error(e);
            keys.into_iter()
                .map(|key| EntryOutcome::failed(key, error.clone()))
                .collect()
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::registry_path;
    use crate::domain::error::{DomainError, Result};
    use crate::domain::models::{EnvVar, Kind, Scope, VarKey};
    use std::io::ErrorKind;
    use tracing::{debug, warn};
    use winreg::enums::*;
    use winreg::types::FromRegValue;
    use winreg::{RegKey, RegValue};

    fn hive(scope: Scope) -> RegKey {
        match scope {
            Scope::User => RegKey::predef(HKEY_CURRENT_USER),
            Scope::Machine => RegKey::predef(HKEY_LOCAL_MACHINE),
        }
    }

    fn map_io(scope: Scope, e: std::io::Error) -> DomainError {
        match e.kind() {
            ErrorKind::PermissionDenied => {
                DomainError::PermissionDenied(format!("{} 注册表拒绝访问: {}", scope, e))
            }
            _ => DomainError::Gateway(format!("{}: {}", registry_path(scope), e)),
        }
    }

    pub fn read_scope(scope: Scope) -> Result<Vec<EnvVar>> {
        let key = match hive(scope).open_subkey_with_flags(registry_path(scope), KEY_READ) {
            Ok(key) => key,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_io(scope, e)),
        };

        let mut entries = Vec::new();
        for item in key.enum_values() {
            let (name, value) = item.map_err(|e| map_io(scope, e))?;
            let kind = match value.vtype {
                REG_SZ => Kind::Literal,
                REG_EXPAND_SZ => Kind::Expandable,
                other => {
                    warn!(%name, ?other, "跳过非字符串类型的注册表值");
                    continue;
                }
            };
            let text = String::from_reg_value(&value).map_err(|e| map_io(scope, e))?;
            entries.push(EnvVar::new(name, text, kind, scope));
        }
        debug!(%scope, count = entries.len(), "读取注册表");
        Ok(entries)
    }

    fn open_writable(scope: Scope) -> Result<RegKey> {
        hive(scope)
            .open_subkey_with_flags(registry_path(scope), KEY_READ | KEY_WRITE)
            .map_err(|e| map_io(scope, e))
    }

    /// REG_EXPAND_SZ 需要以 UTF-16LE（含结尾 NUL）原样写入
    fn expand_sz(value: &str) -> RegValue {
        let bytes = value
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        RegValue {
            bytes,
            vtype: REG_EXPAND_SZ,
        }
    }

    pub fn write_value(entry: &EnvVar) -> Result<()> {
        let key = open_writable(entry.scope)?;
        let written = match entry.kind {
            Kind::Literal => key.set_value(&entry.name, &entry.value),
            Kind::Expandable => key.set_raw_value(&entry.name, &expand_sz(&entry.value)),
        };
        written.map_err(|e| map_io(entry.scope, e))?;
        debug!(key = %entry.key(), kind = %entry.kind, "写入注册表");
        Ok(())
    }

    pub fn delete_value(target: &VarKey) -> Result<()> {
        let key = open_writable(target.scope)?;
        match key.delete_value(&target.name) {
            Ok(()) => {
                debug!(key = %target, "删除注册表值");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = %target, "注册表中不存在，视为已删除");
                Ok(())
            }
            Err(e) => Err(map_io(target.scope, e)),
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use crate::domain::error::{DomainError, Result};
    use crate::domain::models::{EnvVar, Scope, VarKey};

    fn unsupported() -> DomainError {
        DomainError::Gateway("当前平台不支持注册表环境变量（仅 Windows）".to_string())
    }

    pub fn read_scope(_scope: Scope) -> Result<Vec<EnvVar>> {
        Err(unsupported())
    }

    pub fn write_value(_entry: &EnvVar) -> Result<()> {
        Err(unsupported())
    }

    pub fn delete_value(_key: &VarKey) -> Result<()> {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_paths() {
        assert_eq!(registry_path(Scope::User), "Environment");
        assert!(registry_path(Scope::Machine).ends_with("Session Manager\\Environment"));
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_non_windows_reports_gateway_error() {
        let gateway = RegistryGateway::new();
        assert!(matches!(
            gateway.read_all().await,
            Err(DomainError::Gateway(_))
        ));

        let outcomes = gateway.write_batch(&[EnvVar::user("A", "1")]).await;
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_ok());

        let outcomes = gateway.delete_batch(&[VarKey::new("A", Scope::User)]).await;
        assert!(!outcomes[0].is_ok());
    }
}
