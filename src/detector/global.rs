//! 全局分析器单例管理
use once_cell::sync::OnceCell;
use std::sync::Arc;

use rsuseragent_engine::FieldRecord;

use super::analyzer::UserAgentAnalyzer;
use crate::config::AnalyzerConfig;
use crate::error::{UaResult, UserAgentError};
use crate::rule::RuleSet;

/// 全局分析器实例
static GLOBAL_ANALYZER: OnceCell<UserAgentAnalyzer> = OnceCell::new();

/// 带自定义配置初始化全局分析器（已初始化时直接返回）
pub fn init_global_analyzer(config: AnalyzerConfig) -> UaResult<()> {
    GLOBAL_ANALYZER
        .get_or_try_init(|| UserAgentAnalyzer::new(config))
        .map(|_| ())
}

/// 使用已构建的规则集初始化全局分析器
pub fn init_global_analyzer_with_rules(rule_set: Arc<RuleSet>, config: AnalyzerConfig) -> UaResult<()> {
    GLOBAL_ANALYZER
        .get_or_try_init(|| UserAgentAnalyzer::with_rule_set(rule_set, config))
        .map(|_| ())
}

/// 异步读取规则后初始化全局分析器
#[cfg(feature = "async-io")]
pub async fn init_global_analyzer_async(config: AnalyzerConfig) -> UaResult<()> {
    if GLOBAL_ANALYZER.get().is_some() {
        return Ok(());
    }
    let analyzer = UserAgentAnalyzer::new_async(config).await?;
    // 并发初始化时先完成者生效
    let _ = GLOBAL_ANALYZER.set(analyzer);
    Ok(())
}

/// 获取全局分析器；未初始化时使用默认配置初始化
pub fn global_analyzer() -> UaResult<&'static UserAgentAnalyzer> {
    GLOBAL_ANALYZER
        .get_or_try_init(|| UserAgentAnalyzer::new(AnalyzerConfig::default()))
        .map_err(|e| UserAgentError::AnalyzerInitError(e.to_string()))
}

/// 已初始化的全局分析器
pub fn try_global_analyzer() -> UaResult<&'static UserAgentAnalyzer> {
    GLOBAL_ANALYZER
        .get()
        .ok_or_else(|| UserAgentError::AnalyzerNotInitialized("call init_global_analyzer first".to_string()))
}

/// 使用全局分析器解析
pub fn parse(input: &str) -> UaResult<FieldRecord> {
    Ok(global_analyzer()?.parse(input))
}

#[cfg(all(test, feature = "embedded-rules"))]
mod tests {
    use super::*;

    #[test]
    fn test_global_parse() {
        init_global_analyzer(AnalyzerConfig::embedded()).unwrap();
        // 重复初始化是幂等的
        init_global_analyzer(AnalyzerConfig::embedded()).unwrap();
        assert!(try_global_analyzer().is_ok());

        let record = parse("Googlebot/2.1 (+http://www.google.com/bot.html)").unwrap();
        assert_eq!(record.value("DeviceClass"), Some("Robot"));
        assert_eq!(record.value("AgentName"), Some("Googlebot"));
    }
}
