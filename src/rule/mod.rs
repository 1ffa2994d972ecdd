//! 规则模块：规则文件模型、加载、模式匹配器、规则集构建
pub mod loader;
pub mod matcher;
pub mod model;
pub mod rule_set;

// 导出核心接口
pub use self::loader::RuleLoader;
pub use self::matcher::{MatcherOptions, PatternMatcher};
pub use self::model::{LookupDef, MatcherDef, RuleDefinitions, SourcedMatcher, TestDef, TestInput};
pub use self::rule_set::{BuildStats, RuleSet, RuleSetOptions};
