//! 对外入口：分析器 + 全局单例 + 测试用例执行
pub mod analyzer;
pub mod global;
pub mod testcase;

pub use self::analyzer::UserAgentAnalyzer;
pub use self::global::{
    global_analyzer, init_global_analyzer, init_global_analyzer_with_rules, parse,
    try_global_analyzer,
};
#[cfg(feature = "async-io")]
pub use self::global::init_global_analyzer_async;
pub use self::testcase::{TestFailure, TestReport};
