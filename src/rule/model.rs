//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化
//!
//! 规则文件结构：
//! ```json
//! { "config": [
//!     { "lookup":  { "name": "...", "map": { "From": "To" } } },
//!     { "matcher": { "options": ["verbose"], "require": ["..."], "extract": ["..."] } },
//!     { "test":    { "input": { "user_agent_string": "..." }, "expected": { "Field": "Value" } } }
//! ] }
//! ```

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// 查找表：名称 + 映射（键大小写不敏感）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LookupDef {
    pub name: String,
    pub map: BTreeMap<String, String>,
}

/// 匹配器定义：require 条件全部满足 + extract 全部可解析时写入字段
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MatcherDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<String>,
    #[serde(default)]
    pub extract: Vec<String>,
}

impl MatcherDef {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o.eq_ignore_ascii_case(option))
    }
}

/// 测试用例输入
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestInput {
    pub user_agent_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// 内嵌测试用例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TestDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub input: TestInput,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expected: BTreeMap<String, String>,
    /// 来源信息（文件名 / 条目序号），加载时填充
    #[serde(default, rename = "metaData", skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TestDef {
    /// 标记为 "only" 或没有期望值的用例：测试集只保留它
    pub fn is_exclusive(&self) -> bool {
        self.expected.is_empty() || self.options.iter().any(|o| o == "only")
    }
}

/// 带来源位置的匹配器定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedMatcher {
    pub file: String,
    pub entry: usize,
    pub def: MatcherDef,
}

/// 所有规则文件合并后的定义集合（RuleSet 构建输入）
#[derive(Debug, Clone, Default)]
pub struct RuleDefinitions {
    /// 查找表名 → (小写键 → 值)
    pub lookups: FxHashMap<String, FxHashMap<String, String>>,
    pub matchers: Vec<SourcedMatcher>,
    pub tests: Vec<TestDef>,
    /// 已加载的文件名（加载顺序）
    pub files: Vec<String>,
    pub(crate) single_test_mode: bool,
}

impl RuleDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某个文件中的匹配器数量
    pub fn matcher_count_in(&self, file: &str) -> usize {
        self.matchers.iter().filter(|m| m.file == file).count()
    }
}
