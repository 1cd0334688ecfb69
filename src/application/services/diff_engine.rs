//! 差异比较引擎
//!
//! 将工作集 W 与系统快照 S 逐键比较：
//! - W 中存在、S 中不存在 → Added
//! - 两者都存在，值或类型不同 → Modified
//! - 两者都存在且完全一致 → Same
//! - S 中存在、W 中不存在 → 原样追加进 W，标记 Removed
//!
//! 比较是精确的字符串比较，不展开占位符，也不对分号列表做集合归一化。

use crate::domain::models::{Classification, DiffClassification};
use crate::domain::store::{EnvironmentStore, SystemSnapshot};

/// 比较结果：补全后的工作集与完整分类
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOutcome {
    pub store: EnvironmentStore,
    pub classification: DiffClassification,
}

/// 差异比较引擎（无状态，纯内存计算）
pub struct DiffEngine;

impl DiffEngine {
    /// 从零计算分类；结果与输入遍历顺序无关
    #[must_use]
    pub fn compute(working: &EnvironmentStore, snapshot: &SystemSnapshot) -> DiffOutcome {
        let mut store = working.clone();
        let mut classification = DiffClassification::new();

        for entry in working.iter() {
            let key = entry.key();
            let class = match snapshot.find(&key) {
                None => Classification::Added,
                Some(system) if entry.same_content(system) => Classification::Same,
                Some(_) => Classification::Modified,
            };
            classification.insert(key, class);
        }

        for system in snapshot.store().iter() {
            let key = system.key();
            if !working.contains(&key) {
                store.upsert(system.clone());
                classification.insert(key, Classification::Removed);
            }
        }

        DiffOutcome {
            store,
            classification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EnvVar, Kind, Scope, VarKey};

    fn store(entries: Vec<EnvVar>) -> EnvironmentStore {
        entries.into_iter().collect()
    }

    fn key(name: &str, scope: Scope) -> VarKey {
        VarKey::new(name, scope)
    }

    #[test]
    fn test_system_only_entry_is_appended_as_removed() {
        let working = store(vec![EnvVar::user("X", "1")]);
        let snapshot =
            SystemSnapshot::capture(vec![EnvVar::user("X", "1"), EnvVar::user("Y", "2")]);

        let outcome = DiffEngine::compute(&working, &snapshot);

        assert_eq!(
            outcome.classification.get(&key("X", Scope::User)),
            Some(Classification::Same)
        );
        assert_eq!(
            outcome.classification.get(&key("Y", Scope::User)),
            Some(Classification::Removed)
        );
        let y = outcome.store.find(&key("Y", Scope::User)).unwrap();
        assert_eq!(y.value, "2");
        assert_eq!(y.kind, Kind::Literal);
    }

    #[test]
    fn test_empty_snapshot_classifies_everything_added() {
        let working = store(vec![EnvVar::user("X", "1"), EnvVar::machine("Z", "3")]);
        let snapshot = SystemSnapshot::capture(vec![]);

        let outcome = DiffEngine::compute(&working, &snapshot);

        assert_eq!(outcome.classification.len(), 2);
        assert_eq!(outcome.classification.summary().added, 2);
        assert_eq!(outcome.store, working);
    }

    #[test]
    fn test_empty_working_set_gets_every_system_entry() {
        let working = EnvironmentStore::new();
        let snapshot = SystemSnapshot::capture(vec![
            EnvVar::user("A", "1"),
            EnvVar::new("B", "%HOME%", Kind::Expandable, Scope::Machine),
        ]);

        let outcome = DiffEngine::compute(&working, &snapshot);

        assert_eq!(outcome.store.len(), 2);
        assert_eq!(outcome.classification.summary().removed, 2);
        let b = outcome.store.find(&key("b", Scope::Machine)).unwrap();
        assert_eq!(b.kind, Kind::Expandable);
        assert_eq!(b.value, "%HOME%");
    }

    #[test]
    fn test_value_change_is_modified() {
        let working = store(vec![EnvVar::machine("PATH", r"C:\a;C:\b")]);
        let snapshot = SystemSnapshot::capture(vec![EnvVar::machine("PATH", r"C:\a")]);

        let outcome = DiffEngine::compute(&working, &snapshot);

        assert_eq!(
            outcome.classification.get(&key("PATH", Scope::Machine)),
            Some(Classification::Modified)
        );
    }

    #[test]
    fn test_kind_change_alone_is_modified() {
        let working = store(vec![EnvVar::new("P", "%X%", Kind::Expandable, Scope::User)]);
        let snapshot = SystemSnapshot::capture(vec![EnvVar::user("P", "%X%")]);

        let outcome = DiffEngine::compute(&working, &snapshot);

        assert_eq!(
            outcome.classification.get(&key("P", Scope::User)),
            Some(Classification::Modified)
        );
    }

    #[test]
    fn test_no_whitespace_normalisation() {
        let working = store(vec![EnvVar::user("A", "x ")]);
        let snapshot = SystemSnapshot::capture(vec![EnvVar::user("A", "x")]);

        let outcome = DiffEngine::compute(&working, &snapshot);
        assert_eq!(
            outcome.classification.get(&key("A", Scope::User)),
            Some(Classification::Modified)
        );
    }

    #[test]
    fn test_name_case_does_not_matter_for_matching() {
        let working = store(vec![EnvVar::user("path", "1")]);
        let snapshot = SystemSnapshot::capture(vec![EnvVar::user("Path", "1")]);

        let outcome = DiffEngine::compute(&working, &snapshot);
        assert_eq!(outcome.store.len(), 1);
        assert_eq!(outcome.classification.summary().same, 1);
    }

    #[test]
    fn test_same_name_in_other_scope_is_independent() {
        let working = store(vec![EnvVar::user("TEMP", "u")]);
        let snapshot = SystemSnapshot::capture(vec![EnvVar::machine("TEMP", "u")]);

        let outcome = DiffEngine::compute(&working, &snapshot);
        assert_eq!(
            outcome.classification.get(&key("TEMP", Scope::User)),
            Some(Classification::Added)
        );
        assert_eq!(
            outcome.classification.get(&key("TEMP", Scope::Machine)),
            Some(Classification::Removed)
        );
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let working = store(vec![
            EnvVar::user("A", "1"),
            EnvVar::user("B", "changed"),
            EnvVar::machine("C", "new"),
        ]);
        let snapshot = SystemSnapshot::capture(vec![
            EnvVar::user("A", "1"),
            EnvVar::user("B", "orig"),
            EnvVar::user("D", "gone"),
        ]);

        let first = DiffEngine::compute(&working, &snapshot);
        let second = DiffEngine::compute(&working, &snapshot);
        assert_eq!(first.classification, second.classification);

        // 对补全后的工作集再次比较，分类保持一致
        let third = DiffEngine::compute(&first.store, &snapshot);
        assert_eq!(
            third.classification.get(&key("D", Scope::User)),
            Some(Classification::Same)
        );
        assert_eq!(
            third.classification.get(&key("B", Scope::User)),
            Some(Classification::Modified)
        );
    }

    #[test]
    fn test_every_working_key_is_classified() {
        let working = store(vec![EnvVar::user("A", "1"), EnvVar::machine("B", "2")]);
        let snapshot = SystemSnapshot::capture(vec![EnvVar::user("C", "3")]);

        let outcome = DiffEngine::compute(&working, &snapshot);
        for k in outcome.store.keys() {
            assert!(outcome.classification.get(k).is_some(), "{k} 未分类");
        }
        assert_eq!(outcome.classification.len(), outcome.store.len());
    }
}
