//! 环境变量实体模型

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 环境变量作用域（对应注册表位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Scope {
    /// 用户级 HKCU\Environment
    #[default]
    User,
    /// 机器级 HKLM\...\Session Manager\Environment（写入需要管理员权限）
    Machine,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::User => write!(f, "User"),
            Scope::Machine => write!(f, "Machine"),
        }
    }
}

impl Scope {
    /// 从字符串解析（不区分大小写）
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Scope::User),
            "machine" => Some(Scope::Machine),
            _ => None,
        }
    }

    /// 宽松解析：未知名称一律视为用户级
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or(Scope::User)
    }

    /// 是否需要管理员权限才能写入
    #[must_use]
    pub fn requires_elevation(&self) -> bool {
        matches!(self, Scope::Machine)
    }
}

/// 值类型：字面量 (REG_SZ) 或含未展开占位符的可展开字符串 (REG_EXPAND_SZ)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Kind {
    #[default]
    #[serde(rename = "String")]
    Literal,
    #[serde(rename = "ExpandString")]
    Expandable,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Literal => write!(f, "String"),
            Kind::Expandable => write!(f, "ExpandString"),
        }
    }
}

impl Kind {
    /// 从字符串解析
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "string" | "literal" | "reg_sz" => Some(Kind::Literal),
            "expandstring" | "expandable" | "expand" | "reg_expand_sz" => Some(Kind::Expandable),
            _ => None,
        }
    }
}

/// 变量标识：(名称, 作用域)
///
/// 名称匹配不区分大小写，但保留原始大小写用于显示和写入。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarKey {
    pub name: String,
    pub scope: Scope,
}

impl VarKey {
    #[must_use]
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }

    fn folded(&self) -> String {
        self.name.to_lowercase()
    }
}

impl PartialEq for VarKey {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope && self.folded() == other.folded()
    }
}

impl Eq for VarKey {}

impl Hash for VarKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
        self.scope.hash(state);
    }
}

impl Ord for VarKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded()
            .cmp(&other.folded())
            .then(self.scope.cmp(&other.scope))
    }
}

impl PartialOrd for VarKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.scope)
    }
}

/// 环境变量条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
    pub kind: Kind,
    pub scope: Scope,
}

impl EnvVar {
    /// 创建新的环境变量条目
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: Kind, scope: Scope) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            scope,
        }
    }

    /// 用户级字面量变量
    #[must_use]
    pub fn user(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, Kind::Literal, Scope::User)
    }

    /// 机器级字面量变量
    #[must_use]
    pub fn machine(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, Kind::Literal, Scope::Machine)
    }

    #[must_use]
    pub fn key(&self) -> VarKey {
        VarKey::new(self.name.clone(), self.scope)
    }

    /// 值与类型是否与另一条目完全一致（精确比较，不做展开或空白归一化）
    #[must_use]
    pub fn same_content(&self, other: &EnvVar) -> bool {
        self.value == other.value && self.kind == other.kind
    }

    /// 过滤匹配：名称、值、作用域任意一项包含关键字（不区分大小写）
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.value.to_lowercase().contains(&needle)
            || self.scope.to_string().to_lowercase().contains(&needle)
    }

    #[must_use]
    pub fn segments(&self) -> ValueSegments {
        ValueSegments::parse(&self.value)
    }
}

/// 分号分隔的值（如 PATH），按项编辑
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueSegments {
    items: Vec<String>,
}

impl ValueSegments {
    pub const SEPARATOR: char = ';';

    /// 拆分值，丢弃空项
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let items = value
            .split(Self::SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 追加一项；已存在（不区分大小写）时返回 false
    pub fn push(&mut self, item: &str) -> bool {
        let item = item.trim();
        if item.is_empty() || self.position(item).is_some() {
            return false;
        }
        self.items.push(item.to_string());
        true
    }

    /// 移除一项；不存在时返回 false
    pub fn remove(&mut self, item: &str) -> bool {
        match self.position(item.trim()) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// 替换指定位置的项
    pub fn replace(&mut self, index: usize, item: &str) -> bool {
        let item = item.trim();
        match self.items.get_mut(index) {
            Some(slot) if !item.is_empty() => {
                *slot = item.to_string();
                true
            }
            _ => false,
        }
    }

    fn position(&self, item: &str) -> Option<usize> {
        let folded = item.to_lowercase();
        self.items.iter().position(|s| s.to_lowercase() == folded)
    }

    #[must_use]
    pub fn join(&self) -> String {
        self.items.join(&Self::SEPARATOR.to_string())
    }
}

/// 输出格式类型
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Env,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "j" => OutputFormat::Json,
            _ => OutputFormat::Env,
        }
    }
}
