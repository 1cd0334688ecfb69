//! 差异协调控制器
//!
//! 会话状态（暂存集、补全后的工作集、系统快照、差异分类）集中在 [`Session`] 中，
//! 由 [`ReconciliationController`] 独占持有。所有修改都经过控制器，
//! 表现层只读取 [`SessionView`] 副本。
//!
//! 操作与允许的差异分类：
//!
//! | 操作 | 允许的分类 |
//! |---|---|
//! | Write / Modify | Added, Modified |
//! | Delete | Same, Modified, Removed |
//! | Restore | Modified, Removed |
//! | ApplyAll | 自动选取所有 Added / Modified |
//!
//! 校验与权限检查在任何 I/O 之前完成，失败时整批拒绝；
//! 通过后逐条提交，单条失败只记录，不中断批次。

use crate::application::services::diff_engine::DiffEngine;
use crate::domain::error::{DomainError, Rejection, Result};
use crate::domain::models::{
    Classification, DiffClassification, DiffDetail, DiffSummary, EnvVar, Scope, VarKey,
};
use crate::domain::repositories::{EntryOutcome, SystemEnvironmentGateway};
use crate::domain::store::{EnvironmentStore, SystemSnapshot};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// 提交类操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Write,
    Modify,
    Delete,
    Restore,
    ApplyAll,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Write => write!(f, "write"),
            Operation::Modify => write!(f, "modify"),
            Operation::Delete => write!(f, "delete"),
            Operation::Restore => write!(f, "restore"),
            Operation::ApplyAll => write!(f, "apply"),
        }
    }
}

impl Operation {
    /// 该操作允许的差异分类
    #[must_use]
    pub fn permits(&self, class: Classification) -> bool {
        use Classification::*;
        match self {
            Operation::Write | Operation::Modify | Operation::ApplyAll => {
                matches!(class, Added | Modified)
            }
            Operation::Delete => matches!(class, Same | Modified | Removed),
            Operation::Restore => matches!(class, Modified | Removed),
        }
    }

    /// 未比较差异时，经操作者确认后是否可以继续
    #[must_use]
    pub fn allows_unverified(&self) -> bool {
        matches!(self, Operation::Write | Operation::Delete)
    }

    /// 是否写入系统（需要权限检查）
    #[must_use]
    pub fn touches_system(&self) -> bool {
        !matches!(self, Operation::Restore)
    }
}

/// 提交请求
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub operation: Operation,
    pub keys: Vec<VarKey>,
    pub elevated: bool,
    /// 操作者已确认在未比较差异的情况下继续
    pub confirmed_without_diff: bool,
}

impl CommitRequest {
    #[must_use]
    pub fn new(operation: Operation, keys: Vec<VarKey>, elevated: bool) -> Self {
        Self {
            operation,
            keys,
            elevated,
            confirmed_without_diff: false,
        }
    }

    /// 应用所有新增/修改的变量
    #[must_use]
    pub fn apply_all(elevated: bool) -> Self {
        Self::new(Operation::ApplyAll, Vec::new(), elevated)
    }

    #[must_use]
    pub fn confirm_without_diff(mut self) -> Self {
        self.confirmed_without_diff = true;
        self
    }
}

/// 批量提交结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub succeeded: Vec<VarKey>,
    pub failed: Vec<(VarKey, String)>,
    /// 提交后是否成功重新读取系统并比较
    pub refreshed: bool,
}

impl BatchResult {
    fn from_outcomes(outcomes: Vec<EntryOutcome>) -> Self {
        let mut result = Self::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(()) => result.succeeded.push(outcome.key),
                Err(e) => result.failed.push((outcome.key, e.to_string())),
            }
        }
        result
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 工作集中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub entry: EnvVar,
    /// 未比较或编辑后待重新比较时为 None
    pub classification: Option<Classification>,
    pub pending: bool,
}

/// 会话只读副本，供表现层渲染
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionView {
    pub rows: Vec<SessionRow>,
    pub summary: Option<DiffSummary>,
    pub snapshot_at: Option<DateTime<Utc>>,
}

impl SessionView {
    /// 按作用域、关键字（名称/值/作用域，不区分大小写）和名称正则筛选
    #[must_use]
    pub fn select(
        &self,
        scope: Option<Scope>,
        needle: Option<&str>,
        pattern: Option<&Regex>,
    ) -> Vec<&SessionRow> {
        self.rows
            .iter()
            .filter(|r| scope.is_none_or(|s| r.entry.scope == s))
            .filter(|r| needle.is_none_or(|n| n.is_empty() || r.entry.matches(n)))
            .filter(|r| pattern.is_none_or(|re| re.is_match(&r.entry.name)))
            .collect()
    }
}

/// 单个会话的全部状态
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// 操作者暂存的变量（不含差异比较时追加的 Removed 行）
    staged: EnvironmentStore,
    /// 补全后的工作集：暂存集 ∪ 系统中存在但未暂存的变量
    working: EnvironmentStore,
    snapshot: Option<Arc<SystemSnapshot>>,
    classification: DiffClassification,
    /// 比较之后被编辑、尚未重新分类的键
    pending: BTreeSet<VarKey>,
    diffed: bool,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定暂存集开始（如备份导入）
    #[must_use]
    pub fn from_store(staged: EnvironmentStore) -> Self {
        Self {
            working: staged.clone(),
            staged,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn staged(&self) -> &EnvironmentStore {
        &self.staged
    }

    #[must_use]
    pub fn working(&self) -> &EnvironmentStore {
        &self.working
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&SystemSnapshot> {
        self.snapshot.as_deref()
    }

    #[must_use]
    pub fn classification(&self) -> &DiffClassification {
        &self.classification
    }

    #[must_use]
    pub fn has_diff(&self) -> bool {
        self.diffed
    }

    #[must_use]
    pub fn pending(&self) -> &BTreeSet<VarKey> {
        &self.pending
    }

    /// 当前分类；未比较或待重新比较时为 None
    #[must_use]
    pub fn class_of(&self, key: &VarKey) -> Option<Classification> {
        if !self.diffed || self.pending.contains(key) {
            return None;
        }
        self.classification.get(key)
    }

    fn set_snapshot(&mut self, snapshot: SystemSnapshot) {
        self.snapshot = Some(Arc::new(snapshot));
    }

    /// 用现有快照从零重新比较
    fn rediff(&mut self) -> Result<DiffSummary> {
        let snapshot = self.snapshot.clone().ok_or_else(|| DomainError::DiffRequired {
            operation: "diff".to_string(),
            pending: Vec::new(),
        })?;

        let outcome = DiffEngine::compute(&self.staged, &snapshot);
        self.working = outcome.store;
        self.classification = outcome.classification;
        self.pending.clear();
        self.diffed = true;
        Ok(self.classification.summary())
    }

    fn invalidate_diff(&mut self) {
        self.working = self.staged.clone();
        self.classification = DiffClassification::new();
        self.pending.clear();
        self.diffed = false;
    }

    fn stage(&mut self, entry: EnvVar) {
        let key = entry.key();
        self.staged.upsert(entry.clone());
        self.working.upsert(entry);
        if self.diffed {
            self.classification.forget(&key);
            self.pending.insert(key);
        }
    }

    fn drop_entry(&mut self, key: &VarKey) {
        self.staged.remove(key);
        self.working.remove(key);
        self.classification.forget(key);
        self.pending.remove(key);
    }

    /// 校验选中的键是否允许执行该操作，返回按名称排序的条目
    fn select(&self, request: &CommitRequest) -> Result<Vec<EnvVar>> {
        let operation = request.operation;
        let mut selected = BTreeMap::new();
        let mut unclassified = Vec::new();
        let mut rejected = Vec::new();

        for key in &request.keys {
            let entry = self
                .working
                .find(key)
                .ok_or_else(|| DomainError::NotFound(key.to_string()))?;

            match self.class_of(key) {
                Some(class) if operation.permits(class) => {}
                Some(class) => rejected.push(Rejection {
                    key: entry.key(),
                    classification: class,
                }),
                None => unclassified.push(entry.key()),
            }
            selected.insert(entry.key(), entry.clone());
        }

        if !unclassified.is_empty()
            && !(request.confirmed_without_diff && operation.allows_unverified())
        {
            return Err(DomainError::DiffRequired {
                operation: operation.to_string(),
                pending: if self.diffed { unclassified } else { Vec::new() },
            });
        }

        if !rejected.is_empty() {
            return Err(DomainError::Validation {
                operation: operation.to_string(),
                rejected,
            });
        }

        Ok(selected.into_values().collect())
    }

    /// 所有新增/修改的条目
    fn select_changed(&self) -> Result<Vec<EnvVar>> {
        if !self.diffed || !self.pending.is_empty() {
            return Err(DomainError::DiffRequired {
                operation: Operation::ApplyAll.to_string(),
                pending: self.pending.iter().cloned().collect(),
            });
        }

        Ok(self
            .working
            .iter()
            .filter(|e| {
                self.classification
                    .get(&e.key())
                    .is_some_and(|c| Operation::ApplyAll.permits(c))
            })
            .cloned()
            .collect())
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        let rows = self
            .working
            .iter()
            .map(|entry| {
                let key = entry.key();
                SessionRow {
                    classification: self.class_of(&key),
                    pending: self.pending.contains(&key),
                    entry: entry.clone(),
                }
            })
            .collect();

        SessionView {
            rows,
            summary: self.diffed.then(|| self.classification.summary()),
            snapshot_at: self.snapshot.as_ref().map(|s| s.captured_at()),
        }
    }
}

/// 占用标记：同一时刻只允许一个操作修改会话
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DomainError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 差异协调控制器
pub struct ReconciliationController {
    gateway: Arc<dyn SystemEnvironmentGateway>,
    session: RwLock<Session>,
    busy: AtomicBool,
}

impl ReconciliationController {
    pub fn new(gateway: Arc<dyn SystemEnvironmentGateway>) -> Self {
        Self::with_session(gateway, Session::new())
    }

    pub fn with_session(gateway: Arc<dyn SystemEnvironmentGateway>, session: Session) -> Self {
        Self {
            gateway,
            session: RwLock::new(session),
            busy: AtomicBool::new(false),
        }
    }

    fn read_session(&self) -> Result<RwLockReadGuard<'_, Session>> {
        self.session
            .read()
            .map_err(|_| DomainError::Storage("会话锁错误".to_string()))
    }

    fn write_session(&self) -> Result<RwLockWriteGuard<'_, Session>> {
        self.session
            .write()
            .map_err(|_| DomainError::Storage("会话锁错误".to_string()))
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    async fn fetch_snapshot(&self) -> Result<SystemSnapshot> {
        let entries = self.gateway.read_all().await?;
        debug!(count = entries.len(), "读取系统环境变量");
        Ok(SystemSnapshot::capture(entries))
    }

    /// 读取系统变量，作为新的暂存集与快照（全部为 Same）
    pub async fn load_snapshot(&self) -> Result<SessionView> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let snapshot = self.fetch_snapshot().await?;

        let mut session = self.write_session()?;
        *session = Session::from_store(snapshot.store().clone());
        session.set_snapshot(snapshot);
        let summary = session.rediff()?;
        info!(%summary, "已加载系统环境变量");
        Ok(session.view())
    }

    /// 重新读取系统快照，并与当前暂存集比较
    pub async fn compare_with_system(&self) -> Result<DiffSummary> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let snapshot = self.fetch_snapshot().await?;

        let mut session = self.write_session()?;
        session.set_snapshot(snapshot);
        let summary = session.rediff()?;
        info!(%summary, "差异对比完成");
        Ok(summary)
    }

    /// 用现有快照重新比较（不重新读取系统）
    pub fn compute_diff(&self) -> Result<DiffSummary> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut session = self.write_session()?;
        session.rediff()
    }

    /// 用导入的变量集替换暂存集；分类清空，需要重新比较
    pub fn replace_working(&self, store: EnvironmentStore) -> Result<()> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut session = self.write_session()?;
        debug!(count = store.len(), "替换暂存集");
        session.staged = store;
        session.invalidate_diff();
        Ok(())
    }

    /// 暂存一次编辑；该键的分类在重新比较前失效
    pub fn stage_edit(&self, entry: EnvVar) -> Result<()> {
        if entry.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument("变量名不能为空".to_string()));
        }
        if entry.name.contains('=') {
            return Err(DomainError::InvalidArgument(format!(
                "变量名不能包含 '=': {}",
                entry.name
            )));
        }

        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut session = self.write_session()?;
        debug!(key = %entry.key(), "暂存编辑");
        session.stage(entry);
        Ok(())
    }

    /// 将选中的变量恢复为快照中的系统值
    pub fn restore(&self, keys: &[VarKey]) -> Result<usize> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut session = self.write_session()?;

        let request = CommitRequest::new(Operation::Restore, keys.to_vec(), false);
        let selected = session.select(&request)?;
        let restored: Vec<EnvVar> = match session.snapshot() {
            Some(snapshot) => selected
                .iter()
                .filter_map(|e| snapshot.find(&e.key()).cloned())
                .collect(),
            None => Vec::new(),
        };

        for entry in &restored {
            session.staged.upsert(entry.clone());
        }
        session.rediff()?;
        info!(count = restored.len(), "已恢复为系统值");
        Ok(restored.len())
    }

    /// 执行提交操作
    pub async fn commit(&self, request: CommitRequest) -> Result<BatchResult> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let operation = request.operation;

        if !operation.touches_system() {
            return Err(DomainError::InvalidArgument(format!(
                "{} 不是提交操作",
                operation
            )));
        }

        let entries = {
            let session = self.read_session()?;
            if operation == Operation::ApplyAll {
                session.select_changed()?
            } else {
                if request.keys.is_empty() {
                    return Err(DomainError::InvalidArgument("未选择任何变量".to_string()));
                }
                session.select(&request)?
            }
        };

        if entries.is_empty() {
            info!(%operation, "没有需要提交的变量");
            return Ok(BatchResult::default());
        }

        let machine_entries = entries
            .iter()
            .filter(|e| e.scope.requires_elevation())
            .count();
        if machine_entries > 0 && !request.elevated {
            warn!(%operation, machine_entries, "缺少管理员权限，整批拒绝");
            return Err(DomainError::InsufficientPrivilege { machine_entries });
        }

        info!(%operation, count = entries.len(), "开始提交");
        let outcomes = match operation {
            Operation::Delete => {
                let keys: Vec<VarKey> = entries.iter().map(EnvVar::key).collect();
                self.gateway.delete_batch(&keys).await
            }
            _ => self.gateway.write_batch(&entries).await,
        };

        let mut result = BatchResult::from_outcomes(outcomes);
        for (key, reason) in &result.failed {
            warn!(%operation, %key, %reason, "提交失败");
        }
        info!(
            %operation,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "提交完成"
        );

        if result.succeeded.is_empty() {
            return Ok(result);
        }

        if operation == Operation::Delete {
            let mut session = self.write_session()?;
            for key in &result.succeeded {
                session.drop_entry(key);
            }
        }

        result.refreshed = self.refresh_after_commit().await?;
        Ok(result)
    }

    /// 提交后重新读取系统并比较；读取失败时会话回到未比较状态
    async fn refresh_after_commit(&self) -> Result<bool> {
        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                let mut session = self.write_session()?;
                session.set_snapshot(snapshot);
                let summary = session.rediff()?;
                debug!(%summary, "提交后重新比较");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "提交后读取系统失败，需要重新比较");
                let mut session = self.write_session()?;
                session.invalidate_diff();
                Ok(false)
            }
        }
    }

    /// 会话只读副本
    pub fn view(&self) -> Result<SessionView> {
        Ok(self.read_session()?.view())
    }

    /// 暂存集副本（用于保存备份）
    pub fn staged_store(&self) -> Result<EnvironmentStore> {
        Ok(self.read_session()?.staged().clone())
    }

    /// 单个变量的差异详情
    pub fn detail(&self, key: &VarKey) -> Result<DiffDetail> {
        let session = self.read_session()?;
        let staged = session.working().find(key).cloned();
        let system = session.snapshot().and_then(|s| s.find(key).cloned());
        if staged.is_none() && system.is_none() {
            return Err(DomainError::NotFound(key.to_string()));
        }
        Ok(DiffDetail {
            key: key.clone(),
            classification: session.class_of(key),
            staged,
            system,
        })
    }

    /// 把名称（可带作用域）解析为工作集中的键
    pub fn resolve(&self, name: &str, scope: Option<Scope>) -> Result<Vec<VarKey>> {
        let session = self.read_session()?;
        let keys: Vec<VarKey> = match scope {
            Some(scope) => {
                let key = VarKey::new(name, scope);
                session.working().find(&key).map(EnvVar::key).into_iter().collect()
            }
            None => session
                .working()
                .find_by_name(name)
                .into_iter()
                .map(EnvVar::key)
                .collect(),
        };

        if keys.is_empty() {
            return Err(DomainError::NotFound(match scope {
                Some(scope) => format!("{} ({})", name, scope),
                None => name.to_string(),
            }));
        }
        Ok(keys)
    }
}
