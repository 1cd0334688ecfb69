//! 内存网关
//!
//! `--dry-run` 时从一次真实读取初始化，之后所有提交只修改内存；
//! 也用作控制器测试的替身。

use crate::domain::error::{DomainError, Result};
use crate::domain::models::{EnvVar, VarKey};
use crate::domain::repositories::{EntryOutcome, SystemEnvironmentGateway};
use crate::domain::store::EnvironmentStore;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// 内存中的"系统"环境变量
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    store: RwLock<EnvironmentStore>,
    /// 写入/删除时总是失败的变量名（小写）
    failing: RwLock<BTreeSet<String>>,
    fail_reads: AtomicBool,
    write_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new(entries: Vec<EnvVar>) -> Self {
        Self {
            store: RwLock::new(entries.into_iter().collect()),
            ..Self::default()
        }
    }

    fn store(&self) -> RwLockReadGuard<'_, EnvironmentStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn store_mut(&self) -> RwLockWriteGuard<'_, EnvironmentStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    fn is_failing(&self, name: &str) -> bool {
        self.failing
            .read()
            .map(|f| f.contains(&name.to_lowercase()))
            .unwrap_or(false)
    }

    /// 让指定名称的写入/删除失败
    pub fn fail_on(&self, name: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(name.to_lowercase());
        }
    }

    /// 让后续读取失败
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    #[must_use]
    pub fn entries(&self) -> Vec<EnvVar> {
        self.store().iter().cloned().collect()
    }

    #[must_use]
    pub fn find(&self, key: &VarKey) -> Option<EnvVar> {
        self.store().find(key).cloned()
    }

    /// write_batch 被调用的次数
    #[must_use]
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::Acquire)
    }

    /// delete_batch 被调用的次数
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::Acquire)
    }

    fn rejected(&self, key: VarKey) -> EntryOutcome {
        let reason = format!("{} 被拒绝写入", key);
        EntryOutcome::failed(key, DomainError::Gateway(reason))
    }
}

#[async_trait]
impl SystemEnvironmentGateway for InMemoryGateway {
    async fn read_all(&self) -> Result<Vec<EnvVar>> {
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(DomainError::Gateway("模拟读取失败".to_string()));
        }
        Ok(self.entries())
    }

    async fn write_batch(&self, entries: &[EnvVar]) -> Vec<EntryOutcome> {
        self.write_calls.fetch_add(1, Ordering::AcqRel);
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.is_failing(&entry.name) {
                outcomes.push(self.rejected(entry.key()));
                continue;
            }
            debug!(key = %entry.key(), "内存写入");
            self.store_mut().upsert(entry.clone());
            outcomes.push(EntryOutcome::ok(entry.key()));
        }
        outcomes
    }

    async fn delete_batch(&self, keys: &[VarKey]) -> Vec<EntryOutcome> {
        self.delete_calls.fetch_add(1, Ordering::AcqRel);
        let mut outcomes = Vec::with_capacity(keys.len());
        for key in keys {
            if self.is_failing(&key.name) {
                outcomes.push(self.rejected(key.clone()));
                continue;
            }
            debug!(%key, "内存删除");
            self.store_mut().remove(key);
            outcomes.push(EntryOutcome::ok(key.clone()));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Scope;

    #[tokio::test]
    async fn test_read_all_sorted() {
        let gateway = InMemoryGateway::new(vec![EnvVar::user("b", "2"), EnvVar::user("A", "1")]);
        let names: Vec<_> = gateway
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["A", "b"]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_success() {
        let gateway = InMemoryGateway::new(vec![]);
        let outcomes = gateway
            .delete_batch(&[VarKey::new("NOPE", Scope::User)])
            .await;
        assert!(outcomes[0].is_ok());
        assert_eq!(gateway.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_entry_does_not_stop_batch() {
        let gateway = InMemoryGateway::new(vec![]);
        gateway.fail_on("BAD");

        let outcomes = gateway
            .write_batch(&[EnvVar::user("bad", "1"), EnvVar::user("good", "2")])
            .await;
        assert!(!outcomes[0].is_ok());
        assert!(outcomes[1].is_ok());
        assert_eq!(gateway.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_count() {
        let gateway = InMemoryGateway::new(vec![EnvVar::user("A", "1"), EnvVar::user("B", "2")]);
        gateway.fail_on("b");
        let count = gateway
            .delete_count(&[VarKey::new("A", Scope::User), VarKey::new("B", Scope::User)])
            .await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_fail_reads() {
        let gateway = InMemoryGateway::new(vec![]);
        gateway.fail_reads(true);
        assert!(gateway.read_all().await.is_err());
    }
}
