//! 全局配置
pub mod analyzer;

pub use analyzer::{
    AnalyzerConfig, AnalyzerConfigBuilder, CacheOptions, RuleOrigin, DEFAULT_CACHE_CAPACITY,
    DEFAULT_CACHE_IDLE_TIMEOUT,
};
