//! 结果缓存：输入字符串 → 已完成的分析记录
//! 后端可替换；后端故障只影响性能，不影响结果
use std::sync::Arc;

use rsuseragent_engine::FieldRecord;

use crate::error::UaResult;

/// 缓存后端操作结果
pub type CacheResult<T> = UaResult<T>;

pub mod lru_backend;
pub mod result_cache;

pub use lru_backend::LruBackend;
pub use result_cache::{CacheStats, ResultCache};

/// 缓存后端协议
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<Arc<FieldRecord>>>;
    fn put(&self, key: &str, record: Arc<FieldRecord>) -> CacheResult<()>;
    fn len(&self) -> CacheResult<usize>;
    fn clear(&self) -> CacheResult<()>;

    /// 容量淘汰次数
    fn evictions(&self) -> u64 {
        0
    }

    /// 空闲过期次数
    fn expirations(&self) -> u64 {
        0
    }
}
