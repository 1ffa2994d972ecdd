pub mod fields;
mod field_record;
mod rule;

// 导出常用项
pub use field_record::{FieldRecord, FieldValue, UNSET_CONFIDENCE};
pub use rule::{Rule, RuleHandle, RuleTemplate};
