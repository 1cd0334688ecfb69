//! Infrastructure Layer - 技术实现
//!
//! 包含：
//! - registry: Windows 注册表网关
//! - memory: 内存网关（dry-run 与测试）
//! - backup: 备份文件编解码
//! - privilege: 权限与系统信息
//! - paths: 路径工具

pub mod backup;
pub mod memory;
pub mod paths;
pub mod privilege;
pub mod registry;

pub use backup::{BackupFile, BackupFormat, JsonBackupCodec, YamlBackupCodec};
pub use memory::InMemoryGateway;
pub use registry::RegistryGateway;
