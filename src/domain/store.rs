//! 内存中的环境变量集合
//!
//! `EnvironmentStore` 以 (名称, 作用域) 为唯一键，遍历顺序按名称（不区分大小写）排序，
//! 保证显示与批处理的顺序稳定。`SystemSnapshot` 是某一时刻从系统读取的只读副本。

use crate::domain::models::{EnvVar, VarKey};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// 环境变量集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentStore {
    entries: BTreeMap<VarKey, EnvVar>,
}

impl EnvironmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 替换同键条目，不存在则追加
    pub fn upsert(&mut self, entry: EnvVar) {
        let key = entry.key();
        // BTreeMap::insert 不会更新已有键，先移除以保留新条目的名称大小写
        self.entries.remove(&key);
        self.entries.insert(key, entry);
    }

    /// 移除条目；不存在时无操作
    pub fn remove(&mut self, key: &VarKey) -> Option<EnvVar> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn find(&self, key: &VarKey) -> Option<&EnvVar> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &VarKey) -> bool {
        self.entries.contains_key(key)
    }

    /// 所有条目，按名称（不区分大小写）排序
    #[must_use]
    pub fn all(&self) -> Vec<&EnvVar> {
        self.entries.values().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvVar> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &VarKey> {
        self.entries.keys()
    }

    /// 按名称查找所有作用域下的条目
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<&EnvVar> {
        let folded = name.to_lowercase();
        self.iter()
            .filter(|v| v.name.to_lowercase() == folded)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<EnvVar> for EnvironmentStore {
    fn from_iter<I: IntoIterator<Item = EnvVar>>(iter: I) -> Self {
        let mut store = Self::new();
        for entry in iter {
            store.upsert(entry);
        }
        store
    }
}

/// 系统快照：捕获后不可变，只作为差异比较的基准
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    store: EnvironmentStore,
    captured_at: DateTime<Utc>,
}

impl SystemSnapshot {
    #[must_use]
    pub fn capture(entries: Vec<EnvVar>) -> Self {
        Self {
            store: entries.into_iter().collect(),
            captured_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &EnvironmentStore {
        &self.store
    }

    #[must_use]
    pub fn find(&self, key: &VarKey) -> Option<&EnvVar> {
        self.store.find(key)
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
