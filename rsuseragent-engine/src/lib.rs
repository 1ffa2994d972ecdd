// 核心公共结构体：字段记录 + 规则协议
pub mod core;
// 兴趣索引：事件键 → 规则句柄
pub mod indexer;
// 分析后处理（派生字段 + 规范化）
pub mod processor;
// 规范化/版本/日志预览工具
pub mod utils;

mod error;

// 顶层导出常用类型
pub use crate::core::{fields, FieldRecord, FieldValue, Rule, RuleHandle, RuleTemplate};
pub use error::{CoreError, CoreResult};
pub use indexer::{InterestIndex, InterestIndexBuilder};
pub use processor::PostProcessor;
