//! 备份文件编解码
//!
//! 两种格式：
//! - YAML（默认）：按作用域分组
//!   ```yaml
//!   machine:
//!   - name: PATH
//!     value: C:\Windows
//!     kind: ExpandString
//!   user:
//!   - name: TEMP
//!     value: '%USERPROFILE%\AppData\Local\Temp'
//!     kind: ExpandString
//!   ```
//! - JSON：带时间戳与数量的记录列表
//!   `{"timestamp": "...", "count": 1, "variables": [{"name", "value", "kind", "scope"}]}`

use crate::domain::error::{DomainError, Result};
use crate::domain::models::{EnvVar, Kind, Scope};
use crate::domain::repositories::BackupCodec;
use crate::domain::store::EnvironmentStore;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 未知类型名按字面量处理
fn parse_kind(name: &str, raw: &str) -> Kind {
    Kind::parse(raw).unwrap_or_else(|| {
        warn!(%name, kind = %raw, "未知的值类型，按 String 处理");
        Kind::Literal
    })
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DomainError::Format("变量名不能为空".to_string()));
    }
    Ok(())
}

// ============ YAML ============

#[derive(Debug, Serialize)]
struct YamlRecordOut<'a> {
    name: &'a str,
    value: &'a str,
    kind: Kind,
}

#[derive(Debug, Serialize)]
struct YamlDocumentOut<'a> {
    machine: Vec<YamlRecordOut<'a>>,
    user: Vec<YamlRecordOut<'a>>,
}

#[derive(Debug, Deserialize)]
struct YamlRecordIn {
    name: String,
    #[serde(default)]
    value: serde_yaml::Value,
    #[serde(default)]
    kind: Option<String>,
}

/// 值可能被 YAML 解析为数字或布尔，统一转回字符串
fn yaml_scalar(name: &str, value: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value;
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(DomainError::Format(format!("{} 的值必须是字符串", name))),
    }
}

/// 分组 YAML 格式
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlBackupCodec;

/// 分组名只认 `machine`（不区分大小写），其余一律为用户级
fn group_scope(group: &str) -> Scope {
    if group.trim().eq_ignore_ascii_case("machine") {
        Scope::Machine
    } else {
        Scope::User
    }
}

impl BackupCodec for YamlBackupCodec {
    fn serialize(&self, store: &EnvironmentStore) -> Result<String> {
        let mut doc = YamlDocumentOut {
            machine: Vec::new(),
            user: Vec::new(),
        };
        for entry in store.iter() {
            let record = YamlRecordOut {
                name: &entry.name,
                value: &entry.value,
                kind: entry.kind,
            };
            match entry.scope {
                Scope::Machine => doc.machine.push(record),
                Scope::User => doc.user.push(record),
            }
        }
        Ok(serde_yaml::to_string(&doc)?)
    }

    fn deserialize(&self, document: &str) -> Result<EnvironmentStore> {
        if document.trim().is_empty() {
            return Ok(EnvironmentStore::new());
        }

        let groups: Option<BTreeMap<String, Option<Vec<YamlRecordIn>>>> =
            serde_yaml::from_str(document)?;

        let mut store = EnvironmentStore::new();
        for (group, records) in groups.unwrap_or_default() {
            let scope = group_scope(&group);
            for record in records.unwrap_or_default() {
                check_name(&record.name)?;
                let value = yaml_scalar(&record.name, record.value)?;
                let kind = record
                    .kind
                    .as_deref()
                    .map_or(Kind::Literal, |k| parse_kind(&record.name, k));
                store.upsert(EnvVar::new(record.name, value, kind, scope));
            }
        }
        Ok(store)
    }
}

// ============ JSON ============

#[derive(Debug, Serialize, Deserialize)]
struct JsonRecord {
    name: String,
    value: String,
    kind: String,
    scope: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    count: Option<usize>,
    variables: Vec<JsonRecord>,
}

/// 记录列表 JSON 格式
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBackupCodec;

impl BackupCodec for JsonBackupCodec {
    fn serialize(&self, store: &EnvironmentStore) -> Result<String> {
        let doc = JsonDocument {
            timestamp: Some(Local::now().to_rfc3339()),
            count: Some(store.len()),
            variables: store
                .iter()
                .map(|e| JsonRecord {
                    name: e.name.clone(),
                    value: e.value.clone(),
                    kind: e.kind.to_string(),
                    scope: e.scope.to_string(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    fn deserialize(&self, document: &str) -> Result<EnvironmentStore> {
        let doc: JsonDocument = serde_json::from_str(document)?;

        if let Some(count) = doc.count
            && count != doc.variables.len()
        {
            warn!(
                declared = count,
                actual = doc.variables.len(),
                "备份文件记录数与 count 不一致"
            );
        }
        if let Some(ts) = &doc.timestamp {
            debug!(timestamp = %ts, "备份时间");
        }

        let mut store = EnvironmentStore::new();
        for record in doc.variables {
            check_name(&record.name)?;
            let kind = parse_kind(&record.name, &record.kind);
            let scope = Scope::parse_lenient(&record.scope);
            store.upsert(EnvVar::new(record.name, record.value, kind, scope));
        }
        Ok(store)
    }
}

// ============ 文件 ============

/// 备份格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackupFormat {
    #[default]
    Yaml,
    Json,
}

impl BackupFormat {
    /// 按扩展名判断：`.json` 为 JSON，其余为 YAML
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => BackupFormat::Json,
            _ => BackupFormat::Yaml,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yaml" | "yml" => Ok(BackupFormat::Yaml),
            "json" => Ok(BackupFormat::Json),
            other => Err(DomainError::InvalidArgument(format!(
                "不支持的备份格式: {}（可选 yaml / json）",
                other
            ))),
        }
    }

    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            BackupFormat::Yaml => "yaml",
            BackupFormat::Json => "json",
        }
    }

    #[must_use]
    pub fn codec(&self) -> Box<dyn BackupCodec> {
        match self {
            BackupFormat::Yaml => Box::new(YamlBackupCodec),
            BackupFormat::Json => Box::new(JsonBackupCodec),
        }
    }
}

/// 磁盘上的备份文件
#[derive(Debug, Clone)]
pub struct BackupFile {
    path: PathBuf,
    format: BackupFormat,
}

impl BackupFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = BackupFormat::from_path(&path);
        Self { path, format }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn format(&self) -> BackupFormat {
        self.format
    }

    pub async fn load(&self) -> Result<EnvironmentStore> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DomainError::FileNotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let store = self.format.codec().deserialize(&content).map_err(|e| match e {
            DomainError::Format(msg) => {
                DomainError::Format(format!("{}: {}", self.path.display(), msg))
            }
            other => other,
        })?;
        info!(path = %self.path.display(), count = store.len(), "已读取备份");
        Ok(store)
    }

    pub async fn save(&self, store: &EnvironmentStore) -> Result<()> {
        let content = self.format.codec().serialize(store)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;
        info!(path = %self.path.display(), count = store.len(), "已保存备份");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::VarKey;

    fn sample() -> EnvironmentStore {
        vec![
            EnvVar::new("Path", r"C:\Windows;%SystemRoot%", Kind::Expandable, Scope::Machine),
            EnvVar::user("TEMP", r"C:\Temp"),
            EnvVar::user("EMPTY", ""),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_yaml_groups_by_scope() {
        let text = YamlBackupCodec.serialize(&sample()).unwrap();
        let machine_at = text.find("machine:").unwrap();
        let user_at = text.find("user:").unwrap();
        assert!(machine_at < user_at);
        assert!(text.contains("kind: ExpandString"));
        assert!(text.contains("kind: String"));
    }

    #[test]
    fn test_yaml_restores_all_fields() {
        let text = YamlBackupCodec.serialize(&sample()).unwrap();
        let store = YamlBackupCodec.deserialize(&text).unwrap();
        assert_eq!(store, sample());
    }

    #[test]
    fn test_yaml_unknown_group_is_user() {
        let doc = "custom:\n- name: A\n  value: '1'\n  kind: String\n";
        let store = YamlBackupCodec.deserialize(doc).unwrap();
        assert!(store.find(&VarKey::new("A", Scope::User)).is_some());
    }

    #[test]
    fn test_yaml_system_group_is_user() {
        let doc = "system:\n- name: A\n  value: '1'\n  kind: String\n";
        let store = YamlBackupCodec.deserialize(doc).unwrap();
        assert!(store.find(&VarKey::new("A", Scope::User)).is_some());
        assert!(store.find(&VarKey::new("A", Scope::Machine)).is_none());
    }

    #[test]
    fn test_json_unknown_scope_is_user() {
        let doc = r#"{"variables":[{"name":"A","value":"1","kind":"String","scope":"System"}]}"#;
        let store = JsonBackupCodec.deserialize(doc).unwrap();
        assert!(store.find(&VarKey::new("A", Scope::User)).is_some());
    }

    #[test]
    fn test_yaml_machine_group_case_insensitive() {
        let doc = "MACHINE:\n- name: A\n  value: x\n  kind: ExpandString\n";
        let store = YamlBackupCodec.deserialize(doc).unwrap();
        let a = store.find(&VarKey::new("A", Scope::Machine)).unwrap();
        assert_eq!(a.kind, Kind::Expandable);
    }

    #[test]
    fn test_yaml_numeric_value_and_empty_group() {
        let doc = "machine:\nuser:\n- name: PORT\n  value: 8080\n  kind: String\n";
        let store = YamlBackupCodec.deserialize(doc).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].value, "8080");
    }

    #[test]
    fn test_yaml_empty_document() {
        assert!(YamlBackupCodec.deserialize("").unwrap().is_empty());
        assert!(YamlBackupCodec.deserialize("{}").unwrap().is_empty());
    }

    #[test]
    fn test_yaml_malformed_is_format_error() {
        let err = YamlBackupCodec.deserialize("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, DomainError::Format(_)));

        let err = YamlBackupCodec
            .deserialize("user:\n- value: no name\n")
            .unwrap_err();
        assert!(matches!(err, DomainError::Format(_)));
    }

    #[test]
    fn test_json_layout() {
        let text = JsonBackupCodec.serialize(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["count"], 3);
        assert_eq!(value["variables"].as_array().unwrap().len(), 3);
        assert!(value["timestamp"].as_str().is_some());

        let first = &value["variables"][0];
        assert_eq!(first["name"], "EMPTY");
        assert_eq!(first["scope"], "User");
        assert_eq!(first["kind"], "String");
    }

    #[test]
    fn test_json_restores_all_fields() {
        let text = JsonBackupCodec.serialize(&sample()).unwrap();
        assert_eq!(JsonBackupCodec.deserialize(&text).unwrap(), sample());
    }

    #[test]
    fn test_json_count_mismatch_still_loads() {
        let doc = r#"{"count": 5, "variables": [{"name": "A", "value": "1", "kind": "String", "scope": "Machine"}]}"#;
        let store = JsonBackupCodec.deserialize(doc).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.find(&VarKey::new("a", Scope::Machine)).is_some());
    }

    #[test]
    fn test_json_missing_variables_is_format_error() {
        let err = JsonBackupCodec.deserialize(r#"{"count": 0}"#).unwrap_err();
        assert!(matches!(err, DomainError::Format(_)));
        let err = JsonBackupCodec.deserialize("not json").unwrap_err();
        assert!(matches!(err, DomainError::Format(_)));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(BackupFormat::from_path(Path::new("a.json")), BackupFormat::Json);
        assert_eq!(BackupFormat::from_path(Path::new("a.JSON")), BackupFormat::Json);
        assert_eq!(BackupFormat::from_path(Path::new("a.yaml")), BackupFormat::Yaml);
        assert_eq!(BackupFormat::from_path(Path::new("a")), BackupFormat::Yaml);
        assert!(BackupFormat::parse("xml").is_err());
    }

    #[tokio::test]
    async fn test_file_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = BackupFile::new(dir.path().join("nested").join("env.json"));
        file.save(&sample()).await.unwrap();
        assert_eq!(file.load().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = BackupFile::new(dir.path().join("none.yaml"));
        assert!(matches!(
            file.load().await,
            Err(DomainError::FileNotFound(_))
        ));
    }
}
