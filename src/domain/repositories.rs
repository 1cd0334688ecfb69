//! 外部协作接口定义（输出端口）

use crate::domain::error::{DomainError, Result};
use crate::domain::models::{EnvVar, VarKey};
use crate::domain::store::EnvironmentStore;
use async_trait::async_trait;

/// 单个条目的写入/删除结果
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub key: VarKey,
    pub result: std::result::Result<(), DomainError>,
}

impl EntryOutcome {
    #[must_use]
    pub fn ok(key: VarKey) -> Self {
        Self { key, result: Ok(()) }
    }

    #[must_use]
    pub fn failed(key: VarKey, error: DomainError) -> Self {
        Self {
            key,
            result: Err(error),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 系统环境变量访问接口（注册表）
///
/// 读取失败视为整体失败（不完整的快照不能作为比较基准）；
/// 批量写入/删除逐条报告结果，单条失败不得中断整个批次。
#[async_trait]
pub trait SystemEnvironmentGateway: Send + Sync {
    /// 读取用户级和机器级全部变量，按名称（不区分大小写）排序
    async fn read_all(&self) -> Result<Vec<EnvVar>>;

    /// 批量写入；`kind` 决定值类型，`scope` 决定目标位置
    async fn write_batch(&self, entries: &[EnvVar]) -> Vec<EntryOutcome>;

    /// 批量删除；不存在的变量视为成功
    async fn delete_batch(&self, keys: &[VarKey]) -> Vec<EntryOutcome>;

    /// 成功删除的数量
    async fn delete_count(&self, keys: &[VarKey]) -> usize {
        self.delete_batch(keys)
            .await
            .iter()
            .filter(|o| o.is_ok())
            .count()
    }
}

/// 备份文档编解码接口
pub trait BackupCodec: Send + Sync {
    /// 序列化为文档文本
    fn serialize(&self, store: &EnvironmentStore) -> Result<String>;

    /// 从文档文本解析；格式错误返回 `DomainError::Format`
    fn deserialize(&self, document: &str) -> Result<EnvironmentStore>;
}
