//! 分析后处理：派生字段 + 规范化
//! 步骤顺序固定（兜底 → 主版本 → 拼接 → 品牌 → 邮箱 → 设备名），顺序本身属于对外行为
use crate::core::fields::*;
use crate::core::FieldRecord;
use crate::utils::{first_version_segment, normalize};

/// 无法解析且无任何分类结果时使用的兜底值
pub const HACKER_VALUE: &str = "Hacker";

/// 兜底写入使用的置信度
pub const HACKER_CONFIDENCE: i64 = 10;

/// 兜底时置为 "Hacker" 的字段
const HACKER_FIELDS: &[&str] = &[
    DEVICE_CLASS,
    DEVICE_BRAND,
    DEVICE_NAME,
    DEVICE_VERSION,
    OPERATING_SYSTEM_CLASS,
    OPERATING_SYSTEM_NAME,
    OPERATING_SYSTEM_VERSION,
    LAYOUT_ENGINE_CLASS,
    LAYOUT_ENGINE_NAME,
    LAYOUT_ENGINE_VERSION,
    LAYOUT_ENGINE_VERSION_MAJOR,
    AGENT_CLASS,
    AGENT_NAME,
    AGENT_VERSION,
    AGENT_VERSION_MAJOR,
];

/// 兜底时置为 "Unknown" 的字段
const HACKER_UNKNOWN_FIELDS: &[&str] = &[HACKER_TOOLKIT, HACKER_ATTACK_VECTOR];

/// (完整版本, 主版本)
const MAJOR_VERSION_PAIRS: &[(&str, &str)] = &[
    (AGENT_VERSION, AGENT_VERSION_MAJOR),
    (LAYOUT_ENGINE_VERSION, LAYOUT_ENGINE_VERSION_MAJOR),
    (WEBVIEW_APP_VERSION, WEBVIEW_APP_VERSION_MAJOR),
];

/// (目标, 第一个字段, 第二个字段)
const CONCAT_TRIPLES: &[(&str, &str, &str)] = &[
    (AGENT_NAME_VERSION, AGENT_NAME, AGENT_VERSION),
    (AGENT_NAME_VERSION_MAJOR, AGENT_NAME, AGENT_VERSION_MAJOR),
    (WEBVIEW_APP_NAME_VERSION_MAJOR, WEBVIEW_APP_NAME, WEBVIEW_APP_VERSION_MAJOR),
    (LAYOUT_ENGINE_NAME_VERSION, LAYOUT_ENGINE_NAME, LAYOUT_ENGINE_VERSION),
    (LAYOUT_ENGINE_NAME_VERSION_MAJOR, LAYOUT_ENGINE_NAME, LAYOUT_ENGINE_VERSION_MAJOR),
    (OPERATING_SYSTEM_NAME_VERSION, OPERATING_SYSTEM_NAME, OPERATING_SYSTEM_VERSION),
];

type Step = fn(&mut FieldRecord);

/// 有序步骤表
const STEPS: &[(&str, Step)] = &[
    ("hacker_fallback", hacker_fallback),
    ("major_versions", major_versions),
    ("concatenations", concatenations),
    ("device_brand", normalize_device_brand),
    ("agent_email", normalize_agent_email),
    ("device_name", device_name_coherence),
];

/// 后处理器（无状态，纯函数集合）
#[derive(Debug, Default, Clone, Copy)]
pub struct PostProcessor;

impl PostProcessor {
    /// 按固定顺序执行全部步骤
    pub fn run(record: &mut FieldRecord) {
        for (name, step) in STEPS {
            log::trace!("[PostProcess] {}", name);
            step(record);
        }
    }
}

#[inline(always)]
fn is_unset(record: &FieldRecord, field: &str) -> bool {
    record.confidence(field).map_or(true, |c| c < 0)
}

/// 1. 语法错误且三大分类字段全部未设置 → 视为攻击/探测
fn hacker_fallback(record: &mut FieldRecord) {
    if !record.has_syntax_error() {
        return;
    }
    let unclassified = [DEVICE_CLASS, OPERATING_SYSTEM_CLASS, LAYOUT_ENGINE_CLASS]
        .iter()
        .all(|field| is_unset(record, field));
    if !unclassified {
        return;
    }

    for field in HACKER_FIELDS {
        record.overwrite(field, HACKER_VALUE, HACKER_CONFIDENCE);
    }
    for field in HACKER_UNKNOWN_FIELDS {
        record.overwrite(field, UNKNOWN_VALUE, HACKER_CONFIDENCE);
    }
}

/// 2. 主版本号派生：主版本字段缺失或未设置时，取完整版本第一段，沿用其置信度
fn major_versions(record: &mut FieldRecord) {
    for (version_field, major_field) in MAJOR_VERSION_PAIRS {
        add_major_version(record, version_field, major_field);
    }
}

fn add_major_version(record: &mut FieldRecord, version_field: &str, major_field: &str) {
    if !is_unset(record, major_field) {
        return;
    }
    let Some(version) = record.get(version_field) else {
        return;
    };
    let Some(value) = version.value() else {
        return;
    };
    let major = first_version_segment(value).to_string();
    let confidence = version.confidence();
    record.set(major_field, &major, confidence);
}

/// 3. 名称 + 版本拼接（去重）
fn concatenations(record: &mut FieldRecord) {
    for (target, first, second) in CONCAT_TRIPLES {
        concat_non_duplicated(record, target, first, second);
    }
}

fn concat_non_duplicated(record: &mut FieldRecord, target: &str, first: &str, second: &str) {
    let read = |name: &str| {
        record
            .get(name)
            .and_then(|f| f.value().map(|v| (v.to_string(), f.confidence())))
    };

    let (value, confidence) = match (read(first), read(second)) {
        (None, None) => return,
        (Some((v, c)), None) | (None, Some((v, c))) => {
            if c < 0 {
                return;
            }
            (v, c)
        }
        (Some((v1, c1)), Some((v2, c2))) => {
            if v1 == v2 {
                (v1, c1)
            } else if v2.starts_with(&v1) {
                (v2, c2)
            } else {
                (format!("{} {}", v1, v2), c1.max(c2))
            }
        }
    };
    record.set(target, &value, confidence);
}

/// 规范化改写：置信度 +1（饱和），改写值总是替换原值
#[inline(always)]
fn rewrite(record: &mut FieldRecord, field: &str, value: &str, confidence: i64) {
    record.overwrite(field, value, confidence.saturating_add(1));
}

/// 对已设置的字段做一次规范化改写，置信度 +1
fn renormalize(record: &mut FieldRecord, field: &str, transform: fn(&str) -> String) {
    let Some(current) = record.get(field) else {
        return;
    };
    if !current.is_set() {
        return;
    }
    let Some(value) = current.value() else {
        return;
    };
    let normalized = transform(value);
    let confidence = current.confidence();
    rewrite(record, field, &normalized, confidence);
}

/// 4. 品牌名规范化
fn normalize_device_brand(record: &mut FieldRecord) {
    renormalize(record, DEVICE_BRAND, normalize::brand);
}

/// 5. 邮箱反混淆
fn normalize_agent_email(record: &mut FieldRecord) {
    renormalize(record, AGENT_INFORMATION_EMAIL, normalize::email);
}

/// 6. 设备名与品牌一致性
fn device_name_coherence(record: &mut FieldRecord) {
    let Some(name) = record.get(DEVICE_NAME) else {
        return;
    };
    if !name.is_set() {
        return;
    }
    let Some(name_value) = name.value() else {
        return;
    };
    let name_confidence = name.confidence();

    let known_brand = record
        .get(DEVICE_BRAND)
        .filter(|brand| brand.is_set())
        .and_then(|brand| brand.value())
        .filter(|brand| *brand != UNKNOWN_VALUE);

    let cleaned = match known_brand {
        Some(brand) => normalize::strip_brand_prefix(brand, name_value),
        None => normalize::brand(name_value),
    };
    rewrite(record, DEVICE_NAME, &cleaned, name_confidence);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(first: Option<(&str, i64)>, second: Option<(&str, i64)>) -> (Option<String>, i64) {
        let mut record = FieldRecord::new("x");
        if let Some((v, c)) = first {
            record.set("First", v, c);
        }
        if let Some((v, c)) = second {
            record.set("Second", v, c);
        }
        concat_non_duplicated(&mut record, "Target", "First", "Second");
        (
            record.value("Target").map(str::to_string),
            record.confidence("Target").unwrap_or(-1),
        )
    }

    #[test]
    fn test_concat_equal_values() {
        assert_eq!(
            concat(Some(("Chrome", 5)), Some(("Chrome", 3))),
            (Some("Chrome".to_string()), 5)
        );
    }

    #[test]
    fn test_concat_prefix_rule() {
        assert_eq!(
            concat(Some(("Safari", 5)), Some(("Safari/604.1", 7))),
            (Some("Safari/604.1".to_string()), 7)
        );
    }

    #[test]
    fn test_concat_joins_at_max_confidence() {
        assert_eq!(
            concat(Some(("Opera", 4)), Some(("Presto", 9))),
            (Some("Opera Presto".to_string()), 9)
        );
    }

    #[test]
    fn test_concat_single_side() {
        assert_eq!(concat(None, Some(("Edge", 5))), (Some("Edge".to_string()), 5));
        assert_eq!(concat(Some(("Edge", 2)), None), (Some("Edge".to_string()), 2));
        assert_eq!(concat(None, None), (None, -1));
    }

    #[test]
    fn test_major_version_derived() {
        let mut record = FieldRecord::new("x");
        record.set(AGENT_VERSION, "91.0.4472.124", 7);
        PostProcessor::run(&mut record);
        assert_eq!(record.value(AGENT_VERSION_MAJOR), Some("91"));
        assert_eq!(record.confidence(AGENT_VERSION_MAJOR), Some(7));
    }

    #[test]
    fn test_major_version_all_pairs() {
        let mut record = FieldRecord::new("x");
        record.set(LAYOUT_ENGINE_NAME, "AppleWebKit", 4);
        record.set(LAYOUT_ENGINE_VERSION, "537.36", 4);
        record.set(WEBVIEW_APP_NAME, "WeChat", 6);
        record.set(WEBVIEW_APP_VERSION, "8.0.2", 6);
        PostProcessor::run(&mut record);

        assert_eq!(record.value(LAYOUT_ENGINE_VERSION_MAJOR), Some("537"));
        assert_eq!(record.confidence(LAYOUT_ENGINE_VERSION_MAJOR), Some(4));
        assert_eq!(record.value(LAYOUT_ENGINE_NAME_VERSION_MAJOR), Some("AppleWebKit 537"));
        assert_eq!(record.value(WEBVIEW_APP_VERSION_MAJOR), Some("8"));
        assert_eq!(record.confidence(WEBVIEW_APP_VERSION_MAJOR), Some(6));
        assert_eq!(record.value(WEBVIEW_APP_NAME_VERSION_MAJOR), Some("WeChat 8"));
        assert_eq!(record.confidence(WEBVIEW_APP_NAME_VERSION_MAJOR), Some(6));
    }

    #[test]
    fn test_major_version_not_overwritten() {
        let mut record = FieldRecord::new("x");
        record.set(AGENT_VERSION, "91.0.4472.124", 7);
        record.set(AGENT_VERSION_MAJOR, "90", 3);
        PostProcessor::run(&mut record);
        assert_eq!(record.value(AGENT_VERSION_MAJOR), Some("90"));
        assert_eq!(record.confidence(AGENT_VERSION_MAJOR), Some(3));
    }

    #[test]
    fn test_name_version_fields() {
        let mut record = FieldRecord::new("x");
        record.set(AGENT_NAME, "Chrome", 5);
        record.set(AGENT_VERSION, "91.0.4472.124", 5);
        PostProcessor::run(&mut record);
        assert_eq!(record.value(AGENT_NAME_VERSION), Some("Chrome 91.0.4472.124"));
        assert_eq!(record.value(AGENT_NAME_VERSION_MAJOR), Some("Chrome 91"));
    }

    #[test]
    fn test_hacker_fallback() {
        let mut record = FieldRecord::new("'; DROP TABLE");
        record.set(AGENT_NAME, "Something", 50);
        record.set_syntax_error();
        PostProcessor::run(&mut record);

        for field in HACKER_FIELDS {
            assert_eq!(record.value(field), Some(HACKER_VALUE), "field {}", field);
        }
        for field in [DEVICE_CLASS, OPERATING_SYSTEM_CLASS, LAYOUT_ENGINE_CLASS, AGENT_CLASS, AGENT_NAME] {
            assert_eq!(record.confidence(field), Some(HACKER_CONFIDENCE), "field {}", field);
        }
        // 品牌/设备名经过规范化步骤，置信度 +1
        assert_eq!(record.confidence(DEVICE_BRAND), Some(HACKER_CONFIDENCE + 1));
        assert_eq!(record.value(HACKER_TOOLKIT), Some(UNKNOWN_VALUE));
        assert_eq!(record.value(HACKER_ATTACK_VECTOR), Some(UNKNOWN_VALUE));
        assert_eq!(record.confidence(HACKER_ATTACK_VECTOR), Some(HACKER_CONFIDENCE));
        assert_eq!(record.value(AGENT_NAME_VERSION), Some("Hacker"));
    }

    #[test]
    fn test_hacker_fallback_skipped_when_classified() {
        let mut record = FieldRecord::new("bad'input");
        record.set(DEVICE_CLASS, "Phone", 1);
        record.set_syntax_error();
        PostProcessor::run(&mut record);
        assert_eq!(record.value(DEVICE_CLASS), Some("Phone"));
        assert_eq!(record.value(AGENT_CLASS), Some(UNKNOWN_VALUE));
        assert!(record.get(HACKER_TOOLKIT).is_none());
    }

    #[test]
    fn test_brand_and_email_normalized() {
        let mut record = FieldRecord::new("x");
        record.set(DEVICE_BRAND, "samsung", 4);
        record.set(AGENT_INFORMATION_EMAIL, "bot [at] example [dot] com", 2);
        PostProcessor::run(&mut record);
        assert_eq!(record.value(DEVICE_BRAND), Some("Samsung"));
        assert_eq!(record.confidence(DEVICE_BRAND), Some(5));
        assert_eq!(record.value(AGENT_INFORMATION_EMAIL), Some("bot@example.com"));
        assert_eq!(record.confidence(AGENT_INFORMATION_EMAIL), Some(3));
    }

    #[test]
    fn test_device_name_coherence() {
        let mut record = FieldRecord::new("x");
        record.set(DEVICE_BRAND, "Samsung", 4);
        record.set(DEVICE_NAME, "Samsung SM-G930F", 4);
        PostProcessor::run(&mut record);
        assert_eq!(record.value(DEVICE_NAME), Some("SM-G930F"));
        assert_eq!(record.confidence(DEVICE_NAME), Some(5));

        // 无品牌：设备名按品牌规则规范化
        let mut record = FieldRecord::new("x");
        record.set(DEVICE_NAME, "nexus 5", 2);
        PostProcessor::run(&mut record);
        assert_eq!(record.value(DEVICE_NAME), Some("Nexus 5"));
    }

    #[test]
    fn test_normalization_at_max_confidence() {
        let mut record = FieldRecord::new("x");
        record.set(DEVICE_BRAND, "samsung", i64::MAX);
        record.set(DEVICE_NAME, "Samsung SM-G930F", i64::MAX);
        record.set(AGENT_INFORMATION_EMAIL, "bot [at] example [dot] com", i64::MAX);
        PostProcessor::run(&mut record);

        assert_eq!(record.value(DEVICE_BRAND), Some("Samsung"));
        assert_eq!(record.confidence(DEVICE_BRAND), Some(i64::MAX));
        assert_eq!(record.value(DEVICE_NAME), Some("SM-G930F"));
        assert_eq!(record.confidence(DEVICE_NAME), Some(i64::MAX));
        assert_eq!(record.value(AGENT_INFORMATION_EMAIL), Some("bot@example.com"));
        assert_eq!(record.confidence(AGENT_INFORMATION_EMAIL), Some(i64::MAX));
    }
}
