//! 字段名常量与字段排序规则
//! 标准字段 / 硬编码派生字段 / 固定前缀排序列表

pub const DEVICE_CLASS: &str = "DeviceClass";
pub const DEVICE_BRAND: &str = "DeviceBrand";
pub const DEVICE_NAME: &str = "DeviceName";
pub const DEVICE_VERSION: &str = "DeviceVersion";
pub const OPERATING_SYSTEM_CLASS: &str = "OperatingSystemClass";
pub const OPERATING_SYSTEM_NAME: &str = "OperatingSystemName";
pub const OPERATING_SYSTEM_VERSION: &str = "OperatingSystemVersion";
pub const OPERATING_SYSTEM_NAME_VERSION: &str = "OperatingSystemNameVersion";
pub const LAYOUT_ENGINE_CLASS: &str = "LayoutEngineClass";
pub const LAYOUT_ENGINE_NAME: &str = "LayoutEngineName";
pub const LAYOUT_ENGINE_VERSION: &str = "LayoutEngineVersion";
pub const LAYOUT_ENGINE_VERSION_MAJOR: &str = "LayoutEngineVersionMajor";
pub const LAYOUT_ENGINE_NAME_VERSION: &str = "LayoutEngineNameVersion";
pub const LAYOUT_ENGINE_NAME_VERSION_MAJOR: &str = "LayoutEngineNameVersionMajor";
pub const AGENT_CLASS: &str = "AgentClass";
pub const AGENT_NAME: &str = "AgentName";
pub const AGENT_VERSION: &str = "AgentVersion";
pub const AGENT_VERSION_MAJOR: &str = "AgentVersionMajor";
pub const AGENT_NAME_VERSION: &str = "AgentNameVersion";
pub const AGENT_NAME_VERSION_MAJOR: &str = "AgentNameVersionMajor";
pub const AGENT_INFORMATION_EMAIL: &str = "AgentInformationEmail";
pub const WEBVIEW_APP_NAME: &str = "WebviewAppName";
pub const WEBVIEW_APP_VERSION: &str = "WebviewAppVersion";
pub const WEBVIEW_APP_VERSION_MAJOR: &str = "WebviewAppVersionMajor";
pub const WEBVIEW_APP_NAME_VERSION_MAJOR: &str = "WebviewAppNameVersionMajor";
pub const HACKER_TOOLKIT: &str = "HackerToolkit";
pub const HACKER_ATTACK_VECTOR: &str = "HackerAttackVector";

/// 语法错误标记字段（分词失败时置为 "true"）
pub const SYNTAX_ERROR: &str = "__SyntaxError__";

/// 导出格式中原始输入使用的保留键
pub const USER_AGENT_STRING: &str = "user_agent_string";

/// 未设置字段的默认值
pub const UNKNOWN_VALUE: &str = "Unknown";

/// 标准字段：每条记录创建时即存在，默认值 "Unknown"
pub const STANDARD_FIELDS: &[&str] = &[
    DEVICE_CLASS,
    DEVICE_BRAND,
    DEVICE_NAME,
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

/// 后处理阶段一定会产出的字段（与规则无关）
pub const HARD_CODED_GENERATED_FIELDS: &[&str] = &[
    SYNTAX_ERROR,
    AGENT_VERSION_MAJOR,
    LAYOUT_ENGINE_VERSION_MAJOR,
    AGENT_NAME_VERSION,
    AGENT_NAME_VERSION_MAJOR,
    LAYOUT_ENGINE_NAME_VERSION,
    LAYOUT_ENGINE_NAME_VERSION_MAJOR,
    OPERATING_SYSTEM_NAME_VERSION,
    WEBVIEW_APP_VERSION_MAJOR,
    WEBVIEW_APP_NAME_VERSION_MAJOR,
];

/// 排序输出时固定在最前面的字段（其余字段按字母序追加）
pub const PRE_SORTED_FIELDS: &[&str] = &[
    DEVICE_CLASS,
    DEVICE_NAME,
    DEVICE_BRAND,
    OPERATING_SYSTEM_CLASS,
    OPERATING_SYSTEM_NAME,
    OPERATING_SYSTEM_VERSION,
    OPERATING_SYSTEM_NAME_VERSION,
    LAYOUT_ENGINE_CLASS,
    LAYOUT_ENGINE_NAME,
    LAYOUT_ENGINE_VERSION,
    LAYOUT_ENGINE_VERSION_MAJOR,
    LAYOUT_ENGINE_NAME_VERSION,
    LAYOUT_ENGINE_NAME_VERSION_MAJOR,
    AGENT_CLASS,
    AGENT_NAME,
    AGENT_VERSION,
    AGENT_VERSION_MAJOR,
    AGENT_NAME_VERSION,
    AGENT_NAME_VERSION_MAJOR,
];

/// 按 "固定前缀 + 剩余字母序" 规则排序字段名
/// 固定前缀中仅保留实际存在于 `names` 的字段
pub fn sort_field_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut rest: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
    rest.sort_unstable();
    rest.dedup();

    let mut result = Vec::with_capacity(rest.len());
    for pinned in PRE_SORTED_FIELDS {
        if let Ok(pos) = rest.binary_search_by(|probe| probe.as_str().cmp(pinned)) {
            result.push(rest.remove(pos));
        }
    }
    result.extend(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_names_pinned_prefix() {
        let sorted = sort_field_names(["Zeta", AGENT_NAME, "Alpha", DEVICE_CLASS, AGENT_CLASS]);
        assert_eq!(sorted, vec![DEVICE_CLASS, AGENT_CLASS, AGENT_NAME, "Alpha", "Zeta"]);
    }

    #[test]
    fn test_sort_field_names_dedup() {
        let sorted = sort_field_names(["B", "A", "B"]);
        assert_eq!(sorted, vec!["A", "B"]);
    }
}
