//! 置信度仲裁字段记录
//! 核心规则：新写入的置信度严格大于当前置信度才会覆盖（相同置信度保留先写入者）
//! confidence == -1 表示 "未设置，持有默认值"

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::fields::{self, SYNTAX_ERROR, UNKNOWN_VALUE, USER_AGENT_STRING};

/// 未设置字段的置信度
pub const UNSET_CONFIDENCE: i64 = -1;

/// 单个字段的值 + 置信度 + 默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    value: Option<String>,
    confidence: i64,
    default_value: Option<String>,
}

impl FieldValue {
    pub fn new(default_value: Option<String>) -> Self {
        Self {
            value: default_value.clone(),
            confidence: UNSET_CONFIDENCE,
            default_value,
        }
    }

    #[inline(always)]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[inline(always)]
    pub fn confidence(&self) -> i64 {
        self.confidence
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// 是否已被规则写入（置信度 >= 0）
    #[inline(always)]
    pub fn is_set(&self) -> bool {
        self.confidence >= 0
    }

    pub fn reset(&mut self) {
        self.value.clone_from(&self.default_value);
        self.confidence = UNSET_CONFIDENCE;
    }

    /// 单调写入：仅当新置信度严格大于当前置信度时生效
    /// 返回：是否写入成功
    #[inline(always)]
    pub fn set_value(&mut self, value: Option<&str>, confidence: i64) -> bool {
        if confidence > self.confidence {
            self.value = value.map(str::to_string);
            self.confidence = confidence;
            return true;
        }
        false
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, ">{}#{}<", self.value.as_deref().unwrap_or("null"), self.confidence)
    }
}

/// 一次分类的结果记录
/// - 提取阶段由单个 Worker 独占
/// - 写入缓存后作为不可变快照，读取方拿到的永远是值拷贝
#[derive(Debug, PartialEq, Eq)]
pub struct FieldRecord {
    user_agent_string: String,
    fields: FxHashMap<String, FieldValue>,
    has_syntax_error: bool,
}

impl Default for FieldRecord {
    fn default() -> Self {
        Self::new("")
    }
}

impl FieldRecord {
    /// 创建记录：标准字段全部预置为 "Unknown" / -1
    pub fn new(user_agent_string: impl Into<String>) -> Self {
        let mut fields = FxHashMap::with_capacity_and_hasher(32, Default::default());
        for name in fields::STANDARD_FIELDS {
            fields.insert(
                name.to_string(),
                FieldValue::new(Some(UNKNOWN_VALUE.to_string())),
            );
        }
        fields.insert(SYNTAX_ERROR.to_string(), FieldValue::new(Some("false".to_string())));

        Self {
            user_agent_string: user_agent_string.into(),
            fields,
            has_syntax_error: false,
        }
    }

    /// 创建记录并预置整个字段全集（规则集构建时确定）
    pub fn with_field_universe<I, S>(user_agent_string: impl Into<String>, universe: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut record = Self::new(user_agent_string);
        for name in universe {
            record
                .fields
                .entry(name.as_ref().to_string())
                .or_insert_with(|| FieldValue::new(Some(UNKNOWN_VALUE.to_string())));
        }
        record
    }

    pub fn user_agent_string(&self) -> &str {
        &self.user_agent_string
    }

    pub fn has_syntax_error(&self) -> bool {
        self.has_syntax_error
    }

    /// 标记分词阶段出现语法错误
    pub fn set_syntax_error(&mut self) {
        self.has_syntax_error = true;
        self.set(SYNTAX_ERROR, "true", 1);
    }

    /// 所有字段回到默认值，复用现有哈希表不重新分配
    pub fn reset(&mut self) {
        self.has_syntax_error = false;
        for field in self.fields.values_mut() {
            field.reset();
        }
    }

    /// 绑定新的输入并重置
    pub fn reset_for(&mut self, user_agent_string: &str) {
        self.user_agent_string.clear();
        self.user_agent_string.push_str(user_agent_string);
        self.reset();
    }

    /// 单调写入字段，未知字段名同样接受（默认值为 None）
    #[inline(always)]
    pub fn set(&mut self, field: &str, value: &str, confidence: i64) -> bool {
        self.set_optional(field, Some(value), confidence)
    }

    pub fn set_optional(&mut self, field: &str, value: Option<&str>, confidence: i64) -> bool {
        let updated = match self.fields.get_mut(field) {
            Some(existing) => existing.set_value(value, confidence),
            None => {
                let mut created = FieldValue::new(None);
                let updated = created.set_value(value, confidence);
                self.fields.insert(field.to_string(), created);
                updated
            }
        };

        if confidence >= 0 {
            if updated {
                log::trace!("USE  {} ({}) = {:?}", field, confidence, value);
            } else {
                log::trace!("SKIP {} ({}) = {:?}", field, confidence, value);
            }
        }
        updated
    }

    /// 无条件覆盖（仅供后处理使用：兜底与规范化改写）
    pub fn overwrite(&mut self, field: &str, value: &str, confidence: i64) {
        let entry = self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| FieldValue::new(None));
        entry.value = Some(value.to_string());
        entry.confidence = confidence;
    }

    /// 把 other 的每个字段按单调规则写入自身，语法错误标记取并集
    pub fn merge(&mut self, other: &FieldRecord) {
        self.has_syntax_error |= other.has_syntax_error;
        for (name, field) in &other.fields {
            if !self.fields.contains_key(name) {
                self.fields
                    .insert(name.clone(), FieldValue::new(field.default_value.clone()));
            }
            self.set_optional(name, field.value(), field.confidence);
        }
    }

    #[inline(always)]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::value)
    }

    pub fn confidence(&self, field: &str) -> Option<i64> {
        self.fields.get(field).map(FieldValue::confidence)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 已被规则写入且有值的字段名（无序）
    pub fn available_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, f)| f.is_set() && f.value.is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// 已被规则写入且有值的字段名（固定前缀 + 字母序）
    pub fn available_field_names_sorted(&self) -> Vec<String> {
        fields::sort_field_names(self.available_field_names())
    }

    /// 扁平化导出：字段名 → 值，附带原始输入（保留键 user_agent_string）
    pub fn to_flat_map(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        for (name, field) in &self.fields {
            if let (true, Some(value)) = (field.is_set(), field.value()) {
                flat.insert(name.clone(), value.to_string());
            }
        }
        flat.insert(USER_AGENT_STRING.to_string(), self.user_agent_string.clone());
        flat
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_flat_map())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_flat_map())
    }

    /// 导出为规则文件中的 test 条目（当前可用字段作为期望值）
    pub fn to_test_case(&self) -> serde_json::Value {
        let mut expected = serde_json::Map::new();
        for name in self.available_field_names_sorted() {
            if let Some(value) = self.value(&name) {
                expected.insert(name, serde_json::Value::String(value.to_string()));
            }
        }
        let mut input = serde_json::Map::new();
        input.insert(
            USER_AGENT_STRING.to_string(),
            serde_json::Value::String(self.user_agent_string.clone()),
        );
        serde_json::json!({
            "test": {
                "input": input,
                "expected": expected,
            }
        })
    }
}

impl Clone for FieldRecord {
    /// 值拷贝：复制原始输入，逐字段按单调规则重新写入
    fn clone(&self) -> Self {
        let mut fields = FxHashMap::with_capacity_and_hasher(self.fields.len(), Default::default());
        for (name, field) in &self.fields {
            fields.insert(name.clone(), FieldValue::new(field.default_value.clone()));
        }
        let mut copy = Self {
            user_agent_string: self.user_agent_string.clone(),
            fields,
            has_syntax_error: self.has_syntax_error,
        };
        for (name, field) in &self.fields {
            copy.set_optional(name, field.value(), field.confidence);
        }
        copy
    }
}

impl Display for FieldRecord {
    /// 人类可读的逐行输出：字段名 : '值' # 置信度
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "  - user_agent_string: '\"{}\"'", self.user_agent_string)?;

        let names: Vec<String> = fields::sort_field_names(
            self.fields
                .iter()
                .filter(|(_, field)| field.value.is_some())
                .map(|(name, _)| name.as_str()),
        );
        let max_len = names.iter().map(String::len).max().unwrap_or(0);

        for name in &names {
            if let Some(field) = self.fields.get(name) {
                writeln!(
                    f,
                    "    {:<width$}: '{}' # {}",
                    name,
                    field.value().unwrap_or_default(),
                    field.confidence,
                    width = max_len + 2
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fields::{AGENT_NAME, AGENT_VERSION, DEVICE_CLASS};

    #[test]
    fn test_new_record_has_defaults() {
        let record = FieldRecord::new("Mozilla/5.0");
        let device_class = record.get(DEVICE_CLASS).unwrap();
        assert_eq!(device_class.value(), Some("Unknown"));
        assert_eq!(device_class.confidence(), -1);
        assert_eq!(record.value(SYNTAX_ERROR), Some("false"));
        assert!(record.get("NoSuchField").is_none());
    }

    #[test]
    fn test_monotonic_confidence() {
        // 低 → 高：覆盖
        let mut record = FieldRecord::new("x");
        assert!(record.set(AGENT_NAME, "Firefox", 5));
        assert!(record.set(AGENT_NAME, "Chrome", 6));
        assert_eq!(record.value(AGENT_NAME), Some("Chrome"));

        // 高 → 低：丢弃
        assert!(!record.set(AGENT_NAME, "Safari", 2));
        assert_eq!(record.value(AGENT_NAME), Some("Chrome"));

        // 相同置信度：保留先写入者
        assert!(!record.set(AGENT_NAME, "Edge", 6));
        assert_eq!(record.value(AGENT_NAME), Some("Chrome"));
        assert_eq!(record.confidence(AGENT_NAME), Some(6));
    }

    #[test]
    fn test_monotonic_confidence_exhaustive_pairs() {
        for c1 in -1..=4 {
            for c2 in -1..=4 {
                let mut record = FieldRecord::new("x");
                record.set("Field", "v1", c1);
                record.set("Field", "v2", c2);
                let expected = if c2 > c1 {
                    Some("v2")
                } else if c1 > -1 {
                    Some("v1")
                } else {
                    None
                };
                assert_eq!(record.value("Field"), expected, "c1={} c2={}", c1, c2);
            }
        }
    }

    #[test]
    fn test_unknown_field_accepted() {
        let mut record = FieldRecord::new("x");
        assert!(record.set("AdHocField", "yes", 3));
        assert_eq!(record.value("AdHocField"), Some("yes"));
        assert!(record.available_field_names().contains(&"AdHocField".to_string()));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut record = FieldRecord::new("x");
        record.set(DEVICE_CLASS, "Phone", 10);
        record.set("AdHocField", "yes", 3);
        record.set_syntax_error();
        record.reset();

        assert_eq!(record.value(DEVICE_CLASS), Some("Unknown"));
        assert_eq!(record.confidence(DEVICE_CLASS), Some(-1));
        assert_eq!(record.value("AdHocField"), None);
        assert!(!record.has_syntax_error());
        assert_eq!(record.value(SYNTAX_ERROR), Some("false"));
    }

    #[test]
    fn test_clone_fidelity() {
        let mut record = FieldRecord::with_field_universe("Agent/1.0", ["WebviewAppName"]);
        record.set(AGENT_NAME, "Agent", 4);
        record.set(AGENT_VERSION, "1.0", 7);
        record.set("AdHocField", "x", 0);
        record.set_syntax_error();

        let copy = record.clone();
        assert_eq!(copy, record);
        for (name, field) in record.iter() {
            let cloned = copy.get(name).unwrap();
            assert_eq!(cloned.value(), field.value(), "field {}", name);
            assert_eq!(cloned.confidence(), field.confidence(), "field {}", name);
        }
    }

    #[test]
    fn test_clone_is_value_copy() {
        let mut record = FieldRecord::new("x");
        record.set(AGENT_NAME, "Chrome", 5);
        let mut copy = record.clone();
        copy.set(AGENT_NAME, "Changed", 50);
        assert_eq!(record.value(AGENT_NAME), Some("Chrome"));
    }

    #[test]
    fn test_merge() {
        let mut base = FieldRecord::new("x");
        base.set(AGENT_NAME, "Chrome", 5);
        base.set(AGENT_VERSION, "91", 9);

        let mut other = FieldRecord::new("x");
        other.set(AGENT_NAME, "Edge", 8);
        other.set(AGENT_VERSION, "92", 3);
        other.set("Extra", "e", 1);

        base.merge(&other);
        assert_eq!(base.value(AGENT_NAME), Some("Edge"));
        assert_eq!(base.value(AGENT_VERSION), Some("91"));
        assert_eq!(base.value("Extra"), Some("e"));
    }

    #[test]
    fn test_merge_syntax_error_flag() {
        let mut base = FieldRecord::new("x");
        let mut other = FieldRecord::new("x");
        other.set_syntax_error();

        base.merge(&other);
        assert!(base.has_syntax_error());
        assert_eq!(base.value(SYNTAX_ERROR), Some("true"));

        // 干净记录合并进来不会清除标记
        base.merge(&FieldRecord::new("x"));
        assert!(base.has_syntax_error());
    }

    #[test]
    fn test_overwrite_ignores_confidence() {
        let mut record = FieldRecord::new("x");
        record.set(AGENT_NAME, "Chrome", 500);
        record.overwrite(AGENT_NAME, "Hacker", 10);
        assert_eq!(record.value(AGENT_NAME), Some("Hacker"));
        assert_eq!(record.confidence(AGENT_NAME), Some(10));
    }

    #[test]
    fn test_flat_map_only_contains_set_fields() {
        let mut record = FieldRecord::new("Mozilla/5.0 Test");
        record.set(AGENT_NAME, "Test", 3);
        record.set_optional("Nothing", None, 5);

        let flat = record.to_flat_map();
        assert_eq!(flat.get(AGENT_NAME).map(String::as_str), Some("Test"));
        assert_eq!(flat.get(USER_AGENT_STRING).map(String::as_str), Some("Mozilla/5.0 Test"));
        assert!(!flat.contains_key(DEVICE_CLASS));
        assert!(!flat.contains_key("Nothing"));

        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json[AGENT_NAME], "Test");
    }

    #[test]
    fn test_to_test_case() {
        let mut record = FieldRecord::new("Test/1");
        record.set(AGENT_NAME, "Test", 3);
        let case = record.to_test_case();
        assert_eq!(case["test"]["input"][USER_AGENT_STRING], "Test/1");
        assert_eq!(case["test"]["expected"][AGENT_NAME], "Test");
        assert!(case["test"]["expected"].get(DEVICE_CLASS).is_none());
    }

    #[test]
    fn test_display_dump() {
        let mut record = FieldRecord::new("Test/1");
        record.set(AGENT_NAME, "Test", 3);
        let dump = record.to_string();
        assert!(dump.starts_with("  - user_agent_string: '\"Test/1\"'\n"));
        assert!(dump.contains("'Test' # 3"));
        assert!(dump.contains("'Unknown' # -1"));
    }
}
