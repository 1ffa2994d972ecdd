//! rsuseragent - 基于声明式规则的 User-Agent 解析与分类库

// 导出全局错误类型
pub use self::error::{UaResult, UserAgentError};

// 导出配置模块
pub use self::config::{AnalyzerConfig, AnalyzerConfigBuilder, CacheOptions, RuleOrigin};

// 导出规则模块核心接口
pub use self::rule::{
    BuildStats, LookupDef, MatcherDef, PatternMatcher, RuleDefinitions, RuleLoader, RuleSet,
    RuleSetOptions, TestDef,
};

// 导出分词模块核心接口
pub use self::tokenizer::{EventSink, TokenizeOutcome, Tokenizer, UserAgentFlattener};

// 导出执行/缓存模块核心接口
pub use self::analyzer::{AnalysisPhase, Worker, WorkerPool};
pub use self::cache::{CacheBackend, CacheStats, LruBackend, ResultCache};

// 导出分析入口（含全局单例简化接口）
pub use self::detector::{
    global_analyzer, init_global_analyzer, init_global_analyzer_with_rules, parse,
    try_global_analyzer, TestFailure, TestReport, UserAgentAnalyzer,
};
#[cfg(feature = "async-io")]
pub use self::detector::init_global_analyzer_async;

// 内核类型
pub use rsuseragent_engine::{fields, FieldRecord, FieldValue, Rule, RuleHandle, RuleTemplate};

// 声明所有子模块
pub mod analyzer;
pub mod cache;
pub mod config;
pub mod detector;
pub mod error;
pub mod rule;
pub mod tokenizer;

/// 编译期内置的默认规则库
#[cfg(feature = "embedded-rules")]
pub mod embedded_rules {
    pub const DEFAULT_RULES_NAME: &str = "default_rules.json";

    pub static DEFAULT_RULES_JSON: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/default_rules.json"));
}

/// 把 log 记录转发到 tracing 订阅者
#[cfg(feature = "tracing")]
pub fn init_tracing_bridge() -> UaResult<()> {
    tracing_log::LogTracer::init().map_err(|e| UserAgentError::AnalyzerInitError(e.to_string()))
}
