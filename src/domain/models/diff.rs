//! 差异分类模型

use crate::domain::models::env_var::{EnvVar, VarKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 单个变量相对系统快照的差异分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Same,
    Added,
    Modified,
    Removed,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Same => write!(f, "same"),
            Classification::Added => write!(f, "added"),
            Classification::Modified => write!(f, "modified"),
            Classification::Removed => write!(f, "removed"),
        }
    }
}

impl Classification {
    /// 列表显示用的标记符号
    #[must_use]
    pub fn marker(&self) -> char {
        match self {
            Classification::Same => '=',
            Classification::Added => '+',
            Classification::Modified => '~',
            Classification::Removed => '-',
        }
    }
}

/// 完整的差异分类映射：(名称, 作用域) → 分类
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffClassification {
    entries: BTreeMap<VarKey, Classification>,
}

impl DiffClassification {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: VarKey, class: Classification) {
        self.entries.insert(key, class);
    }

    /// 清除单个键的分类（编辑后待重新比较）
    pub fn forget(&mut self, key: &VarKey) -> Option<Classification> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &VarKey) -> Option<Classification> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarKey, Classification)> {
        self.entries.iter().map(|(k, c)| (k, *c))
    }

    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for (_, class) in self.iter() {
            match class {
                Classification::Same => summary.same += 1,
                Classification::Added => summary.added += 1,
                Classification::Modified => summary.modified += 1,
                Classification::Removed => summary.removed += 1,
            }
        }
        summary
    }
}

/// 差异统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub same: usize,
}

impl DiffSummary {
    /// 有待提交的变化（新增 + 修改）
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.added + self.modified
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "新增:{}, 修改:{}, 删除:{}, 相同:{}",
            self.added, self.modified, self.removed, self.same
        )
    }
}

/// 单个变量的差异详情：暂存值与系统值对照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffDetail {
    pub key: VarKey,
    pub classification: Option<Classification>,
    pub staged: Option<EnvVar>,
    pub system: Option<EnvVar>,
}
