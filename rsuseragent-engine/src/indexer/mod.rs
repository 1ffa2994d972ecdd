mod interest_index;

// 对外只导出具体内容，不导出模块名
pub use interest_index::{literal_key, InterestIndex, InterestIndexBuilder};
